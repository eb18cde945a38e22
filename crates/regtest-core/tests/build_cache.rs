mod common;

use common::write_file;
use pretty_assertions::assert_eq;
use regtest_core::{
    BuildCommands,
    CompareToolCache,
    ConfigValue,
    build_cache::{
        COMPARE_TOOL_BINARY,
        CONFIG_HASH_LEN,
    },
    case::BuildOptions,
    error::BuildError,
};
use std::{
    fs,
    path::PathBuf,
};

const RECIPE: &str = "\
CUDA_PATH :=
SIMU_OPTION += -DMODEL=HYDRO
#SIMU_OPTION += -DFLOAT8
";

struct ToolTree {
    dir: tempfile::TempDir,
}

impl ToolTree {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("source/Makefile"), RECIPE);
        write_file(
            &dir.path().join("eureka.config"),
            "CUDA_PATH       /usr/local/cuda\nMPI_PATH        /opt/mpi\nNVCC = nvcc\n",
        );
        Self { dir }
    }

    fn path(
        &self,
        relative: &str,
    ) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// The "build" ships the edited recipe as the tool and counts its runs
    fn cache(&self) -> CompareToolCache {
        let build = format!(
            "echo built >> {} && cp Makefile {}",
            self.path("builds").display(),
            COMPARE_TOOL_BINARY
        );
        CompareToolCache::with_paths(
            self.path("source"),
            self.path("tools"),
            self.path("eureka.config"),
        )
        .with_commands(BuildCommands::new(None, build))
    }

    fn builds(&self) -> usize {
        fs::read_to_string(self.path("builds"))
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }
}

fn options(double: bool) -> BuildOptions {
    let mut options = BuildOptions::new();
    options.insert("model".into(), "HYDRO".into());
    options.insert("double".into(), ConfigValue::Bool(double));
    options
}

#[test]
fn identical_configurations_build_once() {
    let tree = ToolTree::new();
    let mut cache = tree.cache();

    let first = cache.get_tool(&options(true)).unwrap();
    let second = cache.get_tool(&options(true)).unwrap();

    assert_eq!(first, second);
    assert_eq!(tree.builds(), 1);
    assert_eq!(first.file_name().unwrap(), COMPARE_TOOL_BINARY);
    let hash = first.parent().unwrap().file_name().unwrap().to_string_lossy();
    assert_eq!(hash.len(), CONFIG_HASH_LEN);
    assert_eq!(first.parent().unwrap().parent().unwrap(), tree.path("tools"));

    // a new cache finds the tool on disk
    let reused = tree.cache().get_tool(&options(true)).unwrap();
    assert_eq!(reused, first);
    assert_eq!(tree.builds(), 1);
}

#[test]
fn the_recipe_is_edited_for_the_build_and_restored_after() {
    let tree = ToolTree::new();
    let tool = tree.cache().get_tool(&options(true)).unwrap();

    let built_recipe = fs::read_to_string(&tool).unwrap();
    assert_eq!(
        built_recipe,
        "CUDA_PATH := /usr/local/cuda\n#\nSIMU_OPTION += -DMODEL=HYDRO\nSIMU_OPTION += -DFLOAT8\n"
    );
    assert_eq!(fs::read_to_string(tree.path("source/Makefile")).unwrap(), RECIPE);
    assert!(!tree.path("source/Makefile.origin").exists());
    assert!(!tree.path("source/make.log").exists());
}

#[test]
fn different_configurations_get_their_own_tool() {
    let tree = ToolTree::new();
    let mut cache = tree.cache();

    let double = cache.get_tool(&options(true)).unwrap();
    let single = cache.get_tool(&options(false)).unwrap();

    assert_ne!(double, single);
    assert_eq!(tree.builds(), 2);
}

#[test]
fn unknown_models_are_rejected_before_building() {
    let tree = ToolTree::new();
    let mut options = options(false);
    options.insert("model".into(), "MHD".into());

    let err = tree.cache().get_tool(&options).unwrap_err();

    assert!(matches!(err, BuildError::UnknownModel(ref model) if model == "MHD"));
    assert_eq!(tree.builds(), 0);
    assert!(tree.path("source/Makefile").is_file());
}
