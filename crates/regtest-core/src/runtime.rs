//! Resolved run configuration, built once and passed to every component

use crate::{
    build_cache::TOOLS_DIR,
    case::{
        Priority,
        TestCase,
    },
    error::ConfigError,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::{
        self,
        Path,
        PathBuf,
    },
    thread,
};

/// Commit of the simulation code the reference data was produced with
pub const SUPPORTED_COMMIT: &str = "13409ab33b12d84780076b6a9beb07317ca145f1";

/// Local reference store, relative to the simulation root
pub const DEFAULT_LOCAL_REFERENCES: &str = "regression_test/references/local";

const THREADS_PER_CORE: usize = 2;
pub const DEFAULT_CORES_PER_RANK: u32 = 8;

/// Number of MPI ranks filling this machine at [`DEFAULT_CORES_PER_RANK`]
pub fn default_mpi_ranks() -> u32 {
    let threads = thread::available_parallelism().map_or(1, usize::from);
    let ranks = threads / THREADS_PER_CORE / DEFAULT_CORES_PER_RANK as usize;
    ranks.max(1) as u32
}

/// Where reference data is read from and written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceLocation {
    /// Directory tree `<dir>/<test_id>/<file>`
    Local(PathBuf),
    /// Remote catalog; see [`RemoteSettings`]
    Cloud,
}

impl ReferenceLocation {
    /// Parse `local`, `local:<path>` or `cloud`.
    ///
    /// Relative local paths are resolved against `root`.
    pub fn parse(
        location: &str,
        root: &Path,
    ) -> Result<Self, ConfigError> {
        let (kind, payload) = location.split_once(':').unwrap_or((location, ""));
        match (kind.trim(), payload.trim()) {
            ("local", payload) => {
                let payload = if payload.is_empty() {
                    DEFAULT_LOCAL_REFERENCES
                } else {
                    payload
                };
                let path = Path::new(payload);
                Ok(ReferenceLocation::Local(if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root.join(path)
                }))
            },
            ("cloud", _) => Ok(ReferenceLocation::Cloud),
            _ => Err(ConfigError::UnknownReferenceLocation(location.to_string())),
        }
    }
}

/// Connection settings of the remote reference catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub api_url: String,
    /// Folder holding one subfolder per reference version
    pub root_folder_id: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            api_url: "https://girder.hub.yt/api/v1".into(),
            root_folder_id: "64f1b5cd5545e01fe3479259".into(),
            api_key_env: "REGTEST_API_KEY".into(),
        }
    }
}

/// Unresolved settings, as collected from the command line
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Root of the simulation source tree
    pub root: PathBuf,
    pub error_level: u8,
    /// `high`, `medium`, `low` or an integer
    pub priority: String,
    pub output: String,
    pub update_ref: bool,
    pub machine: String,
    pub mpi_rank: u32,
    pub mpi_core_per_rank: u32,
    pub tags: Vec<String>,
    pub reference_loc: String,
    pub reports: Vec<String>,
    /// Interpreter running the build configuration script
    pub python: String,
    pub remote: RemoteSettings,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            error_level: 0,
            priority: "high".into(),
            output: "test.log".into(),
            update_ref: false,
            machine: "eureka_intel".into(),
            mpi_rank: default_mpi_ranks(),
            mpi_core_per_rank: DEFAULT_CORES_PER_RANK,
            tags: Vec::new(),
            reference_loc: "local".into(),
            reports: vec!["SHORT".into(), "TIMING".into()],
            python: "python3".into(),
            remote: RemoteSettings::default(),
        }
    }
}

/// Frozen configuration of one run
#[derive(Debug, Clone)]
pub struct RuntimeVariables {
    root: PathBuf,
    num_threads: usize,
    python: String,
    error_level: u8,
    priority: Priority,
    output: PathBuf,
    update_ref: bool,
    machine: String,
    mpi_rank: u32,
    mpi_core_per_rank: u32,
    tags: Vec<String>,
    reference_loc: ReferenceLocation,
    reports: Vec<String>,
    remote: RemoteSettings,
}

impl RuntimeVariables {
    pub fn new(settings: RuntimeSettings) -> Result<Self, ConfigError> {
        if settings.error_level > 2 {
            return Err(ConfigError::ErrorLevel(settings.error_level));
        }
        let priority = settings
            .priority
            .parse::<Priority>()
            .map_err(ConfigError::Priority)?;
        let root = path::absolute(&settings.root)?;
        let output = if settings.output.ends_with(".log") {
            settings.output
        } else {
            format!("{}.log", settings.output)
        };
        let reference_loc = ReferenceLocation::parse(&settings.reference_loc, &root)?;
        Ok(Self {
            num_threads: thread::available_parallelism().map_or(1, usize::from),
            python: settings.python,
            error_level: settings.error_level,
            priority,
            output: PathBuf::from(output),
            update_ref: settings.update_ref,
            machine: settings.machine,
            mpi_rank: settings.mpi_rank,
            mpi_core_per_rank: settings.mpi_core_per_rank,
            tags: settings.tags,
            reference_loc,
            reports: settings.reports,
            remote: settings.remote,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn python(&self) -> &str {
        &self.python
    }

    pub fn error_level(&self) -> u8 {
        self.error_level
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Log file of the run, always ending in `.log`
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Record new references instead of only comparing against them
    pub fn update_ref(&self) -> bool {
        self.update_ref
    }

    pub fn machine(&self) -> &str {
        &self.machine
    }

    pub fn mpi_rank(&self) -> u32 {
        self.mpi_rank
    }

    pub fn mpi_core_per_rank(&self) -> u32 {
        self.mpi_core_per_rank
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn reference_loc(&self) -> &ReferenceLocation {
        &self.reference_loc
    }

    pub fn reports(&self) -> &[String] {
        &self.reports
    }

    pub fn remote(&self) -> &RemoteSettings {
        &self.remote
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn run_root(&self) -> PathBuf {
        self.root.join("regression_test").join("run")
    }

    /// Isolated working directory of a case
    pub fn run_dir(
        &self,
        case: &TestCase,
    ) -> PathBuf {
        self.run_root().join(case.test_id())
    }

    /// Cache directory of built compare tools
    pub fn tools_root(&self) -> PathBuf {
        self.run_root().join(TOOLS_DIR)
    }

    pub fn compare_tool_source(&self) -> PathBuf {
        self.root
            .join("tool")
            .join("analysis")
            .join("gamer_compare_data")
    }

    pub fn machine_config(&self) -> PathBuf {
        self.root
            .join("configs")
            .join(format!("{}.config", self.machine))
    }

    pub fn test_problem_dir(
        &self,
        source: &str,
    ) -> PathBuf {
        self.root.join("example").join("test_problem").join(source)
    }

    /// Staging directory of references downloaded from the catalog
    pub fn cloud_reference_root(&self) -> PathBuf {
        self.root
            .join("regression_test")
            .join("references")
            .join("cloud")
    }

    pub fn version_list_dir(&self) -> PathBuf {
        self.root.join("regression_test").join("compare_version_list")
    }

    /// `<output stem>_timing.log`, under `regression_test` when relative
    pub fn timing_report_path(&self) -> PathBuf {
        let base = if self.output.is_absolute() {
            self.output.clone()
        } else {
            self.root.join("regression_test").join(&self.output)
        };
        let base = base.to_string_lossy();
        let stem = base.strip_suffix(".log").unwrap_or(&base);
        PathBuf::from(format!("{}_timing.log", stem))
    }

    /// Name/value pairs of every setting, for the run header
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("root", self.root.display().to_string()),
            ("num_threads", self.num_threads.to_string()),
            ("python", self.python.clone()),
            ("error_level", self.error_level.to_string()),
            ("priority", self.priority.to_string()),
            ("output", self.output.display().to_string()),
            ("update_ref", self.update_ref.to_string()),
            ("machine", self.machine.clone()),
            ("mpi_rank", self.mpi_rank.to_string()),
            ("mpi_core_per_rank", self.mpi_core_per_rank.to_string()),
            ("tags", format!("{:?}", self.tags)),
            (
                "reference_loc",
                match &self.reference_loc {
                    ReferenceLocation::Local(path) => {
                        format!("local:{}", path.display())
                    },
                    ReferenceLocation::Cloud => "cloud".to_string(),
                },
            ),
            ("reports", self.reports.join(" ")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings(root: &Path) -> RuntimeSettings {
        RuntimeSettings {
            root: root.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn resolves_defaults() {
        let rtvars = RuntimeVariables::new(settings(Path::new("/opt/gamer"))).unwrap();
        assert_eq!(rtvars.priority(), Priority::HIGH);
        assert_eq!(rtvars.output(), Path::new("test.log"));
        assert_eq!(
            rtvars.reference_loc(),
            &ReferenceLocation::Local(PathBuf::from(
                "/opt/gamer/regression_test/references/local"
            ))
        );
        assert_eq!(
            rtvars.timing_report_path(),
            PathBuf::from("/opt/gamer/regression_test/test_timing.log")
        );
        assert_eq!(
            rtvars.machine_config(),
            PathBuf::from("/opt/gamer/configs/eureka_intel.config")
        );
    }

    #[test]
    fn output_gains_log_suffix() {
        let mut s = settings(Path::new("/opt/gamer"));
        s.output = "/tmp/nightly".into();
        let rtvars = RuntimeVariables::new(s).unwrap();
        assert_eq!(rtvars.output(), Path::new("/tmp/nightly.log"));
        assert_eq!(
            rtvars.timing_report_path(),
            PathBuf::from("/tmp/nightly_timing.log")
        );
    }

    #[test]
    fn reference_locations() {
        let root = Path::new("/opt/gamer");
        assert_eq!(
            ReferenceLocation::parse("local:/data/refs", root).unwrap(),
            ReferenceLocation::Local(PathBuf::from("/data/refs"))
        );
        assert_eq!(
            ReferenceLocation::parse("local: refs", root).unwrap(),
            ReferenceLocation::Local(PathBuf::from("/opt/gamer/refs"))
        );
        assert_eq!(
            ReferenceLocation::parse("cloud", root).unwrap(),
            ReferenceLocation::Cloud
        );
        assert!(matches!(
            ReferenceLocation::parse("s3:bucket", root),
            Err(ConfigError::UnknownReferenceLocation(_))
        ));
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut s = settings(Path::new("/opt/gamer"));
        s.error_level = 3;
        assert!(matches!(
            RuntimeVariables::new(s),
            Err(ConfigError::ErrorLevel(3))
        ));
        let mut s = settings(Path::new("/opt/gamer"));
        s.priority = "urgent".into();
        assert!(matches!(
            RuntimeVariables::new(s),
            Err(ConfigError::Priority(_))
        ));
    }
}
