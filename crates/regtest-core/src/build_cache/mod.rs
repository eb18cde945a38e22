//! Filesystem-persisted cache of compare tool builds
//!
//! A build is keyed by its build options together with the machine path
//! variables. The cache assumes one run process at a time: the cache
//! directory and the tool recipe are mutated without cross-process locking.

mod recipe;

pub use recipe::{
    MachinePaths,
    RecipeGuard,
    edit_recipe,
    parse_machine_paths,
    read_machine_paths,
};

use crate::{
    case::BuildOptions,
    error::{
        BuildError,
        ProcessError,
    },
    identity::{
        Canonicalize,
        record,
        sha256_hex,
    },
    process::ProcessCommand,
    runtime::RuntimeVariables,
};
use std::{
    collections::HashMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

/// Name of the compare tool binary produced by its recipe
pub const COMPARE_TOOL_BINARY: &str = "GAMER_CompareData";

/// Directory under the run root holding the built tools, one per config hash
pub const TOOLS_DIR: &str = "tools";

/// Hex characters kept from the digest of a build configuration
pub const CONFIG_HASH_LEN: usize = 16;

const RECIPE: &str = "Makefile";
const BUILD_LOG: &str = "make.log";

/// Shell commands cleaning and running an external build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommands {
    pub clean: Option<String>,
    pub build: String,
}

impl Default for BuildCommands {
    fn default() -> Self {
        Self {
            clean: Some("make clean".into()),
            build: "make".into(),
        }
    }
}

impl BuildCommands {
    pub fn new(
        clean: Option<String>,
        build: impl Into<String>,
    ) -> Self {
        Self {
            clean,
            build: build.into(),
        }
    }

    /// Clean, then build in `dir` with merged output teed to `log`.
    pub fn run(
        &self,
        dir: &Path,
        log: &Path,
    ) -> Result<(), ProcessError> {
        if let Some(clean) = &self.clean {
            ProcessCommand::shell(clean.as_str()).current_dir(dir).run()?;
        }
        ProcessCommand::shell(self.build.as_str())
            .current_dir(dir)
            .merge_streams()
            .tee_stdout(log)
            .run()?;
        Ok(())
    }
}

/// Cache key of a build configuration
pub fn config_hash(
    options: &BuildOptions,
    paths: &MachinePaths,
) -> Result<String, BuildError> {
    let canonical = record([
        ("Makefile", options.canonicalize()),
        ("paths", paths.canonicalize()),
    ])?;
    let mut hex = sha256_hex(canonical.to_json().as_bytes());
    hex.truncate(CONFIG_HASH_LEN);
    Ok(hex)
}

/// Builds the compare tool at most once per distinct configuration.
#[derive(Debug)]
pub struct CompareToolCache {
    source_dir: PathBuf,
    tools_root: PathBuf,
    machine_config: PathBuf,
    commands: BuildCommands,
    built: HashMap<String, PathBuf>,
}

impl CompareToolCache {
    pub fn new(rtvars: &RuntimeVariables) -> Self {
        Self::with_paths(
            rtvars.compare_tool_source(),
            rtvars.tools_root(),
            rtvars.machine_config(),
        )
    }

    pub fn with_paths(
        source_dir: impl Into<PathBuf>,
        tools_root: impl Into<PathBuf>,
        machine_config: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            tools_root: tools_root.into(),
            machine_config: machine_config.into(),
            commands: BuildCommands::default(),
            built: HashMap::new(),
        }
    }

    pub fn with_commands(
        mut self,
        commands: BuildCommands,
    ) -> Self {
        self.commands = commands;
        self
    }

    pub fn tools_root(&self) -> &Path {
        &self.tools_root
    }

    /// Path of the tool for `options`, building it on a cache miss.
    pub fn get_tool(
        &mut self,
        options: &BuildOptions,
    ) -> Result<PathBuf, BuildError> {
        let paths = read_machine_paths(&self.machine_config)?;
        let key = config_hash(options, &paths)?;
        let exe = self.tools_root.join(&key).join(COMPARE_TOOL_BINARY);

        if let Some(path) = self.built.get(&key)
            && path.is_file()
        {
            return Ok(path.clone());
        }
        if exe.is_file() {
            tracing::debug!("Reusing compare tool {}", exe.display());
            self.built.insert(key, exe.clone());
            return Ok(exe);
        }

        tracing::info!("Building compare tool {}", key);
        self.build(options, &paths, &exe)?;
        self.built.insert(key, exe.clone());
        Ok(exe)
    }

    fn build(
        &self,
        options: &BuildOptions,
        paths: &MachinePaths,
        exe: &Path,
    ) -> Result<(), BuildError> {
        let recipe = self.source_dir.join(RECIPE);
        let guard = RecipeGuard::stash(&recipe)?;
        let original = match guard.backup() {
            Some(backup) => fs::read_to_string(backup)?,
            None => String::new(),
        };
        fs::write(&recipe, edit_recipe(&original, paths, options)?)?;

        let log = self.source_dir.join(BUILD_LOG);
        self.commands.run(&self.source_dir, &log)?;

        let binary = self.source_dir.join(COMPARE_TOOL_BINARY);
        if !binary.is_file() {
            return Err(BuildError::MissingBinary(binary));
        }
        if let Some(dir) = exe.parent() {
            fs::create_dir_all(dir)?;
        }
        if fs::rename(&binary, exe).is_err() {
            fs::copy(&binary, exe)?;
            fs::remove_file(&binary)?;
        }
        if let Err(err) = fs::remove_file(&log) {
            tracing::debug!("Could not remove {}: {}", log.display(), err);
        }
        drop(guard);
        Ok(())
    }
}
