//! Reference data providers
//!
//! A provider stages the expected artifacts of a case into a directory and,
//! in update mode, stores the artifacts of a run as the new references.

mod catalog;
mod local;
mod remote;

pub use catalog::{
    CatalogClient,
    FolderNode,
    GirderCatalog,
};
pub use local::LocalProvider;
pub use remote::{
    RemoteProvider,
    VERSION_LIST_FILE,
    VERSION_LIST_FOLDER,
    VersionList,
};

use crate::{
    case::TestCase,
    error::{
        CatalogError,
        ReferenceError,
    },
    runtime::{
        ReferenceLocation,
        RuntimeVariables,
    },
};
use std::path::{
    Path,
    PathBuf,
};

pub enum ReferenceProvider {
    Local(LocalProvider),
    Remote(RemoteProvider),
}

impl ReferenceProvider {
    /// Provider for the configured reference location
    pub fn from_runtime(rtvars: &RuntimeVariables) -> Result<Self, CatalogError> {
        Ok(match rtvars.reference_loc() {
            ReferenceLocation::Local(dir) => ReferenceProvider::Local(LocalProvider::new(dir)),
            ReferenceLocation::Cloud => ReferenceProvider::Remote(RemoteProvider::new(
                Box::new(GirderCatalog::new(rtvars.remote())?),
                rtvars.remote().root_folder_id.clone(),
                rtvars.cloud_reference_root(),
                rtvars.version_list_dir(),
            )),
        })
    }

    pub fn reference_root(&self) -> &Path {
        match self {
            ReferenceProvider::Local(local) => local.reference_root(),
            ReferenceProvider::Remote(remote) => remote.reference_root(),
        }
    }

    /// Directory holding every reference file of `case`
    pub fn fetch(
        &mut self,
        case: &TestCase,
    ) -> Result<PathBuf, ReferenceError> {
        match self {
            ReferenceProvider::Local(local) => local.fetch(case),
            ReferenceProvider::Remote(remote) => remote.fetch(case),
        }
    }

    /// Store the artifacts in `run_dir` as the references of `case`.
    ///
    /// The remote store is versioned and updated out of band, so the remote
    /// variant only logs that the update was skipped.
    pub fn push(
        &mut self,
        case: &TestCase,
        run_dir: &Path,
    ) -> Result<(), ReferenceError> {
        match self {
            ReferenceProvider::Local(local) => local.push(case, run_dir),
            ReferenceProvider::Remote(remote) => remote.push(case, run_dir),
        }
    }
}

impl From<LocalProvider> for ReferenceProvider {
    fn from(local: LocalProvider) -> Self {
        ReferenceProvider::Local(local)
    }
}

impl From<RemoteProvider> for ReferenceProvider {
    fn from(remote: RemoteProvider) -> Self {
        ReferenceProvider::Remote(remote)
    }
}
