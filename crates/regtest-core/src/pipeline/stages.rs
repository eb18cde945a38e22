use super::{
    CaseStages,
    Phase,
};
use crate::{
    build_cache::{
        BuildCommands,
        RecipeGuard,
    },
    case::TestCase,
    compare::Comparator,
    error::{
        PhaseError,
        RunError,
    },
    input_file::{
        InputEditError,
        edit_input_file,
    },
    process::ProcessCommand,
    runtime::RuntimeVariables,
    status::{
        Status,
        Timing,
    },
};
use std::{
    fs,
    io,
    path::{
        Path,
        PathBuf,
    },
};
use walkdir::WalkDir;

const RECIPE: &str = "Makefile";
const BUILD_LOG: &str = "make.log";
const BUILD_RECORD: &str = "Makefile.log";
const CONFIGURE_SCRIPT: &str = "configure.py";
const SIMULATION_BINARY: &str = "gamer";
const SIMULATION_LOG: &str = "log";
const NOTE_FILE: &str = "Record__Note";

/// Phases backed by the simulation source tree, its build system and the
/// simulation binary.
pub struct SimulationStages {
    rtvars: RuntimeVariables,
    commands: BuildCommands,
    comparator: Comparator,
}

impl SimulationStages {
    pub fn new(
        rtvars: &RuntimeVariables,
        comparator: Comparator,
    ) -> Self {
        Self {
            rtvars: rtvars.clone(),
            commands: BuildCommands::new(Some("make clean".into()), "make -j"),
            comparator,
        }
    }

    pub fn with_build_commands(
        mut self,
        commands: BuildCommands,
    ) -> Self {
        self.commands = commands;
        self
    }

    fn configure_command(
        &self,
        case: &TestCase,
    ) -> ProcessCommand {
        let mut args = vec![
            self.rtvars.python().to_string(),
            CONFIGURE_SCRIPT.to_string(),
            format!("--machine={}", self.rtvars.machine()),
        ];
        args.extend(
            case.options()
                .iter()
                .map(|(key, value)| format!("--{}={}", key, value)),
        );
        ProcessCommand::new(args)
    }

    fn compile(
        &self,
        case: &TestCase,
    ) -> Result<(), PhaseError> {
        tracing::info!("Start compiling GAMER");
        let src = self.rtvars.src_dir();
        let guard = RecipeGuard::stash(&src.join(RECIPE)).map_err(RunError::from)?;

        let configure = self.configure_command(case).current_dir(&src);
        tracing::debug!("Generating Makefile using: {}", configure.display());
        if let Err(err) = configure.run() {
            tracing::debug!("{}", err);
            return Err(PhaseError::failed(Status::EditingFail, "Error while editing Makefile."));
        }

        let log = src.join(BUILD_LOG);
        if let Err(err) = self.commands.run(&src, &log) {
            tracing::debug!("{}", err);
            return Err(PhaseError::failed(Status::CompileErr, "Compiling error."));
        }
        if let Err(err) = fs::remove_file(&log) {
            tracing::debug!("Could not remove {}: {}", log.display(), err);
        }
        drop(guard);

        let binary = src.join(SIMULATION_BINARY);
        if !binary.is_file() {
            return Err(PhaseError::failed(
                Status::MissingFile,
                format!("{} does not exist.", binary.display()),
            ));
        }
        tracing::info!("Compiling GAMER done.");
        Ok(())
    }

    fn prepare(
        &self,
        case: &TestCase,
        run_dir: &Path,
    ) -> Result<(), PhaseError> {
        let origin = self.rtvars.test_problem_dir(case.source());
        tracing::info!(
            "Copying the test folder: {} ---> {}",
            origin.display(),
            run_dir.display()
        );
        let src = self.rtvars.src_dir();
        let copied = copy_tree(&origin, run_dir).and_then(|()| {
            for name in [SIMULATION_BINARY, BUILD_RECORD] {
                fs::copy(src.join(name), run_dir.join(name))?;
            }
            Ok(())
        });
        if let Err(err) = copied {
            tracing::debug!("{}", err);
            return Err(PhaseError::failed(
                Status::CopyFiles,
                format!("Error when copying to {}.", run_dir.display()),
            ));
        }
        tracing::info!("Copy completed.");
        Ok(())
    }

    fn set_input(
        &self,
        case: &TestCase,
        run_dir: &Path,
    ) -> Result<(), PhaseError> {
        for (file, settings) in case.inputs() {
            if settings.is_empty() {
                continue;
            }
            tracing::info!("Editing {}.", file);
            edit_input_file(&run_dir.join(file), settings).map_err(|err| {
                let status = match err {
                    InputEditError::MissingFile(_) => Status::MissingFile,
                    _ => Status::EditFile,
                };
                PhaseError::failed(status, err.to_string())
            })?;
            tracing::info!("Editing completed.");
        }
        Ok(())
    }

    fn execute_scripts(
        &self,
        phase: Phase,
        scripts: &[String],
        run_dir: &Path,
    ) -> Result<(), PhaseError> {
        tracing::info!("Start execute scripts. Mode: {}", phase);
        for script in scripts {
            let path = run_dir.join(script);
            if !path.is_file() {
                return Err(PhaseError::failed(
                    Status::MissingFile,
                    format!("{} does not exist.", script),
                ));
            }
            tracing::info!("Executing: {}", script);
            let status = ProcessCommand::new([
                "sh".to_string(),
                path.display().to_string(),
                run_dir.display().to_string(),
            ])
            .current_dir(run_dir)
            .run();
            if let Err(err) = status {
                tracing::debug!("{}", err);
                return Err(PhaseError::failed(
                    Status::External,
                    format!("Error while executing {}.", script),
                ));
            }
        }
        tracing::info!("Done execute scripts.");
        Ok(())
    }

    fn run_command(
        &self,
        case: &TestCase,
    ) -> String {
        let binary = format!("./{}", SIMULATION_BINARY);
        if case.option_enabled("mpi") {
            format!(
                "mpirun -map-by ppr:{}:socket:pe={} --report-bindings {}",
                self.rtvars.mpi_rank(),
                self.rtvars.mpi_core_per_rank(),
                binary
            )
        } else {
            binary
        }
    }

    fn run(
        &self,
        case: &TestCase,
        run_dir: &Path,
    ) -> Result<(), PhaseError> {
        tracing::info!("Running GAMER.");
        let outcome = ProcessCommand::shell(self.run_command(case))
            .current_dir(run_dir)
            .merge_streams()
            .tee_stdout(SIMULATION_LOG)
            .run();
        if let Err(err) = outcome {
            tracing::debug!("{}", err);
            return Err(PhaseError::failed(Status::SimulationFail, "GAMER error"));
        }
        if !run_dir.join(NOTE_FILE).is_file() {
            return Err(PhaseError::failed(
                Status::Fail,
                format!("No {} in {}.", NOTE_FILE, case.test_id()),
            ));
        }
        tracing::info!("GAMER done.");
        Ok(())
    }
}

impl CaseStages for SimulationStages {
    fn execute(
        &mut self,
        phase: Phase,
        case: &TestCase,
        run_dir: &Path,
    ) -> Result<(), PhaseError> {
        match phase {
            Phase::Compile => self.compile(case),
            Phase::Prepare => self.prepare(case, run_dir),
            Phase::SetInput => self.set_input(case, run_dir),
            Phase::PreScript => self.execute_scripts(phase, case.pre_scripts(), run_dir),
            Phase::Run => self.run(case, run_dir),
            Phase::PostScript => self.execute_scripts(phase, case.post_scripts(), run_dir),
            Phase::Compare => Err(RunError::Unexpected(
                "compare runs through CaseStages::compare".into(),
            )
            .into()),
        }
    }

    fn compare(
        &mut self,
        case: &TestCase,
        run_dir: &Path,
        timing: &mut Timing,
    ) -> Result<(), PhaseError> {
        Ok(self.comparator.compare(case, run_dir, timing)?)
    }
}

/// Copy the contents of `from` into `to`, recursively.
fn copy_tree(
    from: &Path,
    to: &Path,
) -> io::Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let target: PathBuf = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        build_cache::CompareToolCache,
        case::{
            ConfigValue,
            TestCaseSpec,
        },
        identity::IdentityRegistry,
        reference::LocalProvider,
        runtime::RuntimeSettings,
    };
    use pretty_assertions::assert_eq;

    fn stages(root: &Path) -> SimulationStages {
        let rtvars = RuntimeVariables::new(RuntimeSettings {
            root: root.to_path_buf(),
            python: "sh".into(),
            mpi_rank: 2,
            mpi_core_per_rank: 4,
            ..Default::default()
        })
        .unwrap();
        let comparator = Comparator::new(
            LocalProvider::new(root.join("refs")).into(),
            CompareToolCache::new(&rtvars),
            0,
            false,
        );
        SimulationStages::new(&rtvars, comparator)
    }

    fn case(spec: TestCaseSpec) -> TestCase {
        spec.build(&mut IdentityRegistry::new()).unwrap()
    }

    #[test]
    fn run_command_uses_mpi_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let stages = stages(dir.path());
        let mut spec = TestCaseSpec::default();
        assert_eq!(stages.run_command(&case(spec.clone())), "./gamer");
        spec.options.insert("mpi".into(), ConfigValue::Bool(true));
        assert_eq!(
            stages.run_command(&case(spec)),
            "mpirun -map-by ppr:2:socket:pe=4 --report-bindings ./gamer"
        );
    }

    #[test]
    fn configure_passes_machine_and_options() {
        let dir = tempfile::tempdir().unwrap();
        let stages = stages(dir.path());
        let mut spec = TestCaseSpec::default();
        spec.options.insert("model".into(), "HYDRO".into());
        spec.options.insert("double".into(), true.into());
        assert_eq!(
            stages.configure_command(&case(spec)).display(),
            "sh configure.py --machine=eureka_intel --model=HYDRO --double=True"
        );
    }

    #[test]
    fn copy_tree_copies_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from");
        fs::create_dir_all(from.join("plot_script")).unwrap();
        fs::write(from.join("Input__Parameter"), "END_T 1\n").unwrap();
        fs::write(from.join("plot_script/plot.py"), "print()\n").unwrap();
        let to = dir.path().join("to");
        fs::create_dir_all(&to).unwrap();

        copy_tree(&from, &to).unwrap();
        assert_eq!(fs::read_to_string(to.join("Input__Parameter")).unwrap(), "END_T 1\n");
        assert!(to.join("plot_script/plot.py").is_file());
    }

    #[test]
    fn missing_script_and_failing_script() {
        let dir = tempfile::tempdir().unwrap();
        let stages = stages(dir.path());
        let run_dir = dir.path().join("run");
        fs::create_dir_all(&run_dir).unwrap();
        fs::write(run_dir.join("ok.sh"), "test -d \"$1\"\n").unwrap();
        fs::write(run_dir.join("bad.sh"), "exit 1\n").unwrap();

        stages
            .execute_scripts(Phase::PreScript, &["ok.sh".into()], &run_dir)
            .unwrap();
        let err = stages
            .execute_scripts(Phase::PreScript, &["missing.sh".into()], &run_dir)
            .unwrap_err();
        assert!(matches!(err, PhaseError::Failed(f) if f.status == Status::MissingFile));
        let err = stages
            .execute_scripts(Phase::PostScript, &["bad.sh".into(), "ok.sh".into()], &run_dir)
            .unwrap_err();
        assert!(matches!(
            err,
            PhaseError::Failed(f) if f.status == Status::External && f.reason == "Error while executing bad.sh."
        ));
    }

    #[test]
    fn set_input_maps_edit_errors() {
        let dir = tempfile::tempdir().unwrap();
        let stages = stages(dir.path());
        let mut spec = TestCaseSpec::default();
        spec.inputs
            .entry("Input__Parameter".into())
            .or_default()
            .insert("END_T".into(), ConfigValue::Float(0.5));
        let case = case(spec);

        let err = stages.set_input(&case, dir.path()).unwrap_err();
        assert!(matches!(err, PhaseError::Failed(f) if f.status == Status::MissingFile));

        fs::write(dir.path().join("Input__Parameter"), "END_STEP 1\n").unwrap();
        let err = stages.set_input(&case, dir.path()).unwrap_err();
        assert!(matches!(err, PhaseError::Failed(f) if f.status == Status::EditFile));

        fs::write(dir.path().join("Input__Parameter"), "END_T 1.0\n").unwrap();
        stages.set_input(&case, dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("Input__Parameter")).unwrap(),
            "END_T 0.5\n"
        );
    }
}
