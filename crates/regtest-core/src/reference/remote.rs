use super::catalog::{
    CatalogClient,
    FolderNode,
};
use crate::{
    case::TestCase,
    error::{
        CatalogError,
        ReferenceError,
    },
    status::Status,
};
use indexmap::IndexMap;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

/// Catalog folder holding the version list
pub const VERSION_LIST_FOLDER: &str = "compare_version_list";
/// File of the version list inside [`VERSION_LIST_FOLDER`]
pub const VERSION_LIST_FILE: &str = "compare_list";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Int(i64),
    Text(String),
}

impl Timestamp {
    fn value(&self) -> Option<i64> {
        match self {
            Timestamp::Int(value) => Some(*value),
            Timestamp::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Upload timestamps of each reference version, per test group
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct VersionList {
    groups: BTreeMap<String, IndexMap<String, Timestamp>>,
}

impl VersionList {
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Timestamp of the newest version of `group`
    pub fn latest(
        &self,
        group: &str,
    ) -> Option<i64> {
        self.groups
            .get(group)?
            .values()
            .filter_map(Timestamp::value)
            .max()
    }
}

/// References staged from the remote catalog.
///
/// The folder tree and the version list are fetched once per provider.
pub struct RemoteProvider {
    client: Box<dyn CatalogClient>,
    root_folder_id: String,
    staging_root: PathBuf,
    version_list_dir: PathBuf,
    tree: Option<FolderNode>,
    versions: Option<VersionList>,
}

fn download_error(
    context: &str,
    err: CatalogError,
) -> ReferenceError {
    ReferenceError::provider(format!("{}: {}", context, err), Status::Download)
}

impl RemoteProvider {
    pub fn new(
        client: Box<dyn CatalogClient>,
        root_folder_id: impl Into<String>,
        staging_root: impl Into<PathBuf>,
        version_list_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            root_folder_id: root_folder_id.into(),
            staging_root: staging_root.into(),
            version_list_dir: version_list_dir.into(),
            tree: None,
            versions: None,
        }
    }

    pub fn reference_root(&self) -> &Path {
        &self.staging_root
    }

    fn ensure_tree(&mut self) -> Result<(), ReferenceError> {
        if self.tree.is_none() {
            let tree = self
                .client
                .folder_tree(&self.root_folder_id)
                .map_err(|err| download_error("Failed to list the reference catalog", err))?;
            self.tree = Some(tree);
        }
        Ok(())
    }

    fn tree(&self) -> Result<&FolderNode, ReferenceError> {
        self.tree
            .as_ref()
            .ok_or_else(|| ReferenceError::provider("Reference catalog not loaded", Status::Download))
    }

    fn ensure_versions(&mut self) -> Result<(), ReferenceError> {
        if self.versions.is_some() {
            return Ok(());
        }
        let folder_id = self
            .tree()?
            .child(VERSION_LIST_FOLDER)
            .map(|node| node.id.clone())
            .ok_or_else(|| {
                ReferenceError::provider(
                    format!("{} not found in the catalog", VERSION_LIST_FOLDER),
                    Status::Download,
                )
            })?;
        tracing::info!("Downloading {}", VERSION_LIST_FOLDER);
        self.client
            .download_folder_files(&folder_id, &self.version_list_dir)
            .map_err(|err| {
                download_error(&format!("Download {} fail! id: {}", VERSION_LIST_FOLDER, folder_id), err)
            })?;
        let path = self.version_list_dir.join(VERSION_LIST_FILE);
        let content = fs::read_to_string(&path).map_err(|err| {
            ReferenceError::provider(
                format!("Failed to read {}: {}", path.display(), err),
                Status::Download,
            )
        })?;
        let versions = VersionList::parse(&content).map_err(|err| {
            ReferenceError::provider(
                format!("Invalid version list {}: {}", path.display(), err),
                Status::Download,
            )
        })?;
        self.versions = Some(versions);
        Ok(())
    }

    fn latest_folder(
        &self,
        group: &str,
    ) -> Result<String, ReferenceError> {
        let latest = self
            .versions
            .as_ref()
            .and_then(|versions| versions.latest(group))
            .ok_or_else(|| {
                ReferenceError::provider(
                    format!("Unable to resolve latest reference version for {}", group),
                    Status::Download,
                )
            })?;
        Ok(format!("{}-{}", group, latest))
    }

    /// Stage the case's references into `<staging_root>/<test_id>`.
    pub fn fetch(
        &mut self,
        case: &TestCase,
    ) -> Result<PathBuf, ReferenceError> {
        self.ensure_tree()?;
        self.ensure_versions()?;

        let ref_folder = self.latest_folder(&case.group_name())?;
        let case_folder = case.name().unwrap_or_else(|| case.case_folder());
        let case_node = self
            .tree()?
            .child(&ref_folder)
            .ok_or_else(|| {
                ReferenceError::Missing(format!("Reference version folder not found: {}", ref_folder))
            })?
            .child(case_folder)
            .ok_or_else(|| {
                ReferenceError::Missing(format!("Case folder not found in cloud: {}", case_folder))
            })?;
        let files = case
            .references()
            .iter()
            .map(|reference| {
                case_node
                    .child(reference.file_name())
                    .map(|node| (reference.file_name().to_string(), node.id.clone()))
                    .ok_or_else(|| {
                        ReferenceError::Missing(format!(
                            "Reference file not found in cloud: {}/{}",
                            case_folder,
                            reference.file_name()
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let case_dir = self.staging_root.join(case.test_id());
        clear_dir(&case_dir).map_err(|err| {
            ReferenceError::provider(
                format!("Failed to clear {}: {}", case_dir.display(), err),
                Status::Download,
            )
        })?;
        for (name, id) in files {
            tracing::info!(
                "Downloading {}/{}/{} (id={}) to {}",
                ref_folder,
                case_folder,
                name,
                id,
                case_dir.display()
            );
            self.client
                .download_item(&id, &case_dir)
                .map_err(|err| download_error(&format!("Download failed for {}:{}", case.test_id(), name), err))?;
        }
        tracing::debug!("Downloaded cloud references to {}", case_dir.display());
        Ok(case_dir)
    }

    /// Uploads go through a separate workflow; this only reports the skip.
    pub fn push(
        &mut self,
        case: &TestCase,
        _run_dir: &Path,
    ) -> Result<(), ReferenceError> {
        tracing::warn!("Cloud reference push not yet implemented for {}", case.test_id());
        tracing::info!("Skipping reference update for cloud provider");
        Ok(())
    }
}

fn clear_dir(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}
