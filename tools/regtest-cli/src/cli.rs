use clap::Parser;
use regtest_core::{
    RemoteSettings,
    RuntimeSettings,
    runtime::{
        DEFAULT_CORES_PER_RANK,
        default_mpi_ranks,
    },
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "regtest")]
#[command(about = "Run the GAMER regression tests")]
pub struct Args {
    /// Error allowed in the comparison (tolerance level)
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub error_level: u8,

    /// Minimum priority of the cases to run: high, medium, low or an integer
    #[arg(short, long, default_value = "high")]
    pub priority: String,

    /// Run only cases carrying all of these tags
    #[arg(short, long, num_args = 1..)]
    pub tags: Vec<String>,

    /// Log file of the run
    #[arg(short, long, default_value = "test.log")]
    pub output: String,

    /// Record the results as the new reference data
    #[arg(short, long)]
    pub update_ref: bool,

    /// Machine configuration under <root>/configs
    #[arg(short, long, default_value = "eureka_intel")]
    pub machine: String,

    /// Reference store: local, local:<path> or cloud
    #[arg(short, long, default_value = "local")]
    pub reference_loc: String,

    /// Report generators to run after the cases
    #[arg(long, num_args = 1.., default_values = ["SHORT", "TIMING"])]
    pub reports: Vec<String>,

    /// MPI ranks per case run
    #[arg(long, default_value_t = default_mpi_ranks())]
    pub mpi_rank: u32,

    #[arg(long, default_value_t = DEFAULT_CORES_PER_RANK)]
    pub mpi_core_per_rank: u32,

    /// Root of the GAMER source tree
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Case manifest; relative paths are resolved against the root
    #[arg(long, default_value = "regression_test/cases.toml")]
    pub cases: PathBuf,

    /// Interpreter running the build configuration script
    #[arg(long, default_value = "python3")]
    pub python: String,
}

impl Args {
    pub fn manifest_path(&self) -> PathBuf {
        if self.cases.is_absolute() {
            self.cases.clone()
        } else {
            self.root.join(&self.cases)
        }
    }

    pub fn settings(
        &self,
        remote: RemoteSettings,
    ) -> RuntimeSettings {
        RuntimeSettings {
            root: self.root.clone(),
            error_level: self.error_level,
            priority: self.priority.clone(),
            output: self.output.clone(),
            update_ref: self.update_ref,
            machine: self.machine.clone(),
            mpi_rank: self.mpi_rank,
            mpi_core_per_rank: self.mpi_core_per_rank,
            tags: self.tags.clone(),
            reference_loc: self.reference_loc.clone(),
            reports: self.reports.clone(),
            python: self.python.clone(),
            remote,
        }
    }
}
