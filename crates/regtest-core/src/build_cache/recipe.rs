//! Build recipe (Makefile) handling

use crate::{
    case::{
        BuildOptions,
        ConfigValue,
    },
    error::BuildError,
};
use indexmap::IndexMap;
use regex::Regex;
use std::{
    fs,
    io,
    path::{
        Path,
        PathBuf,
    },
    sync::LazyLock,
};

static PATH_LINE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+|:=").unwrap_or_else(|_| unreachable!()));

/// Machine-specific path variables, in file order
pub type MachinePaths = IndexMap<String, String>;

/// Collect `KEY := value` path variables from a machine configuration.
///
/// Every line mentioning `PATH` contributes its first token as key and its
/// second token (if any) as value.
pub fn parse_machine_paths(content: &str) -> MachinePaths {
    content
        .lines()
        .filter(|line| line.contains("PATH"))
        .filter_map(|line| {
            let mut tokens = PATH_LINE_SPLIT.split(line).filter(|t| !t.is_empty());
            let key = tokens.next()?;
            let value = tokens.next().unwrap_or("");
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

pub fn read_machine_paths(path: &Path) -> Result<MachinePaths, BuildError> {
    let content = fs::read_to_string(path).map_err(|source| BuildError::MachineConfig {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_machine_paths(&content))
}

const MODEL_LINE: &str = "SIMU_OPTION += -DMODEL=HYDRO";

/// Feature options and the preprocessor flag each one enables
const FEATURE_FLAGS: [(&str, &str); 3] = [
    ("double", "FLOAT8"),
    ("debug", "GAMER_DEBUG"),
    ("hdf5", "SUPPORT_HDF5"),
];

/// Rewrite the compare tool recipe for a build configuration.
///
/// Path assignments `KEY :=` become `KEY := <value>` followed by the
/// original remainder commented out on the next line; feature flags are
/// enabled by uncommenting their `SIMU_OPTION` line.
pub fn edit_recipe(
    content: &str,
    paths: &MachinePaths,
    options: &BuildOptions,
) -> Result<String, BuildError> {
    let mut content = content.to_string();
    for (key, value) in paths {
        content = content.replace(
            &format!("{} :=", key),
            &format!("{} := {}\n#", key, value),
        );
    }

    let model = options
        .get("model")
        .map_or_else(|| "HYDRO".to_string(), ConfigValue::to_string);
    match model.as_str() {
        "HYDRO" => {},
        "ELBDM" => content = content.replace(MODEL_LINE, "SIMU_OPTION += -DMODEL=ELBDM"),
        other => return Err(BuildError::UnknownModel(other.to_string())),
    }

    for (option, flag) in FEATURE_FLAGS {
        if options.get(option).is_some_and(ConfigValue::is_truthy) {
            content = content.replace(
                &format!("#SIMU_OPTION += -D{}", flag),
                &format!("SIMU_OPTION += -D{}", flag),
            );
        }
    }
    Ok(content)
}

/// Moves a recipe aside for the lifetime of the guard.
///
/// Dropping the guard puts the original back, or removes the generated
/// recipe if there was no original, on every exit path.
#[derive(Debug)]
pub struct RecipeGuard {
    path: PathBuf,
    backup: PathBuf,
    had_original: bool,
}

impl RecipeGuard {
    pub fn stash(path: &Path) -> io::Result<Self> {
        let backup = path.with_file_name(format!(
            "{}.origin",
            path.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned())
        ));
        let had_original = path.is_file();
        if had_original {
            fs::rename(path, &backup)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            backup,
            had_original,
        })
    }

    /// Where the original recipe is kept meanwhile
    pub fn backup(&self) -> Option<&Path> {
        self.had_original.then_some(self.backup.as_path())
    }

    fn restore(&self) -> io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        if self.had_original {
            fs::rename(&self.backup, &self.path)?;
        }
        Ok(())
    }
}

impl Drop for RecipeGuard {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            tracing::error!(
                "Failed to restore {}: {}",
                self.path.display(),
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MACHINE: &str = "\
# machine configuration
CUDA_PATH       /usr/local/cuda
FFTW2_PATH :=   /opt/fftw2
MPI_PATH		/opt/mpi
HDF5_PATH
NCORE 8
";

    const RECIPE: &str = "\
CUDA_PATH := /default/cuda
SIMU_OPTION += -DMODEL=HYDRO
#SIMU_OPTION += -DFLOAT8
#SIMU_OPTION += -DGAMER_DEBUG
#SIMU_OPTION += -DSUPPORT_HDF5
";

    #[test]
    fn machine_paths_from_path_lines() {
        let paths = parse_machine_paths(MACHINE);
        assert_eq!(
            paths.into_iter().collect::<Vec<_>>(),
            vec![
                ("CUDA_PATH".to_string(), "/usr/local/cuda".to_string()),
                ("FFTW2_PATH".to_string(), "/opt/fftw2".to_string()),
                ("MPI_PATH".to_string(), "/opt/mpi".to_string()),
                ("HDF5_PATH".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn recipe_edit_applies_paths_model_and_flags() {
        let mut paths = MachinePaths::new();
        paths.insert("CUDA_PATH".into(), "/usr/local/cuda".into());
        let mut options = BuildOptions::new();
        options.insert("model".into(), "ELBDM".into());
        options.insert("double".into(), true.into());
        options.insert("debug".into(), false.into());

        let edited = edit_recipe(RECIPE, &paths, &options).unwrap();
        assert_eq!(
            edited,
            "\
CUDA_PATH := /usr/local/cuda
# /default/cuda
SIMU_OPTION += -DMODEL=ELBDM
SIMU_OPTION += -DFLOAT8
#SIMU_OPTION += -DGAMER_DEBUG
#SIMU_OPTION += -DSUPPORT_HDF5
"
        );
    }

    #[test]
    fn unknown_model_is_an_error() {
        let mut options = BuildOptions::new();
        options.insert("model".into(), "MHD".into());
        assert!(matches!(
            edit_recipe(RECIPE, &MachinePaths::new(), &options),
            Err(BuildError::UnknownModel(m)) if m == "MHD"
        ));
    }

    #[test]
    fn guard_restores_original_recipe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Makefile");
        fs::write(&path, "original").unwrap();
        {
            let guard = RecipeGuard::stash(&path).unwrap();
            assert!(!path.exists());
            assert!(guard.backup().unwrap().exists());
            fs::write(&path, "edited").unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
        assert!(!dir.path().join("Makefile.origin").exists());
    }

    #[test]
    fn guard_removes_generated_recipe_without_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Makefile");
        {
            let guard = RecipeGuard::stash(&path).unwrap();
            assert!(guard.backup().is_none());
            fs::write(&path, "generated").unwrap();
        }
        assert!(!path.exists());
    }
}
