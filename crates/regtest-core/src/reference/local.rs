use crate::{
    case::TestCase,
    error::ReferenceError,
    status::Status,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

/// References kept in a directory tree `<base>/<test_id>/<file>`
#[derive(Debug, Clone)]
pub struct LocalProvider {
    base_dir: PathBuf,
}

impl LocalProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn reference_root(&self) -> &Path {
        &self.base_dir
    }

    pub fn fetch(
        &self,
        case: &TestCase,
    ) -> Result<PathBuf, ReferenceError> {
        let case_dir = self.base_dir.join(case.test_id());
        if !case_dir.is_dir() {
            return Err(ReferenceError::Missing(format!(
                "Local reference directory missing: {}",
                case_dir.display()
            )));
        }
        let missing: Vec<_> = case
            .references()
            .iter()
            .map(|reference| reference.file_name())
            .filter(|name| !case_dir.join(name).is_file())
            .collect();
        if !missing.is_empty() {
            return Err(ReferenceError::Missing(format!(
                "Missing reference files for {}: {}",
                case.test_id(),
                missing.join(", ")
            )));
        }
        tracing::debug!("Using local references at {}", case_dir.display());
        Ok(case_dir)
    }

    /// Copy the produced artifacts of `run_dir` into the store.
    pub fn push(
        &self,
        case: &TestCase,
        run_dir: &Path,
    ) -> Result<(), ReferenceError> {
        let case_dir = self.base_dir.join(case.test_id());
        let upload_error = |err: std::io::Error| {
            ReferenceError::provider(
                format!("Failed to update references in {}: {}", case_dir.display(), err),
                Status::Upload,
            )
        };
        fs::create_dir_all(&case_dir).map_err(upload_error)?;
        for reference in case.references() {
            let name = reference.file_name();
            let src = run_dir.join(name);
            if !src.is_file() {
                tracing::warn!("Source file not found for reference update: {}", src.display());
                continue;
            }
            let dst = case_dir.join(name);
            fs::copy(&src, &dst).map_err(upload_error)?;
            tracing::info!("Updated local reference: {}", dst.display());
        }
        tracing::info!(
            "Pushed references for {} to {}",
            case.test_id(),
            case_dir.display()
        );
        Ok(())
    }
}
