//! A miniature simulation tree driven by shell scripts.
#![allow(dead_code)]

use regtest_core::{
    BuildCommands,
    Comparator,
    ConfigValue,
    FileType,
    ReferenceProvider,
    RuntimeSettings,
    RuntimeVariables,
    SimulationStages,
    TestCaseSpec,
    TestReference,
};
use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{
        Path,
        PathBuf,
    },
};
use tempfile::TempDir;

pub const ORIGINAL_RECIPE: &str = "# original recipe\n";
pub const XLINE: &str = "# x  density\n0.0 1.0\n0.5 0.125\n";
pub const NOTE: &str = "\
Makefile Options (numerical schemes)
*****************************************
MODEL                           HYDRO
*****************************************
";

const CONFIGURE: &str = "\
echo \"configure $*\"
printf 'gamer: main.o\\n' > Makefile
echo \"$*\" > Makefile.log
";

const SIMULATION: &str = "\
#!/bin/sh
echo \"simulation running\"
printf '# x  density\\n0.0 1.0\\n0.5 0.125\\n' > Xline.txt
cat > Record__Note <<'EOF'
Makefile Options (numerical schemes)
*****************************************
MODEL                           HYDRO
*****************************************
EOF
";

/// Build command turning `simulation.sh` into the `gamer` binary
pub const BUILD: &str = "cp simulation.sh gamer && chmod +x gamer";

pub struct FakeGamer {
    dir: TempDir,
}

impl FakeGamer {
    pub fn new() -> Self {
        let gamer = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        gamer.write("src/configure.py", CONFIGURE);
        gamer.write("src/Makefile", ORIGINAL_RECIPE);
        gamer.write("src/simulation.sh", SIMULATION);
        gamer.write(
            "example/test_problem/Hydro/Sod/Input__Parameter",
            "END_T         1.0        # end time\nOUTPUT_DT     0.1\n",
        );
        gamer.write(
            "example/test_problem/Hydro/Sod/pre.sh",
            "echo pre > \"$1/pre.done\"\n",
        );
        gamer
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(
        &self,
        relative: &str,
    ) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write(
        &self,
        relative: &str,
        content: &str,
    ) {
        write_file(&self.path(relative), content);
    }

    pub fn read(
        &self,
        relative: &str,
    ) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    /// Store the expected artifacts of `test_id` in the local reference tree.
    pub fn add_references(
        &self,
        test_id: &str,
        xline: &str,
    ) {
        self.write(&format!("refs/{}/Xline.txt", test_id), xline);
        self.write(&format!("refs/{}/Record__Note", test_id), NOTE);
    }

    pub fn rtvars(
        &self,
        update_ref: bool,
    ) -> RuntimeVariables {
        RuntimeVariables::new(RuntimeSettings {
            root: self.root().to_path_buf(),
            python: "sh".into(),
            update_ref,
            reference_loc: "local:refs".into(),
            output: self.path("test.log").display().to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    pub fn comparator(
        &self,
        rtvars: &RuntimeVariables,
    ) -> Comparator {
        Comparator::from_runtime(rtvars, ReferenceProvider::from_runtime(rtvars).unwrap())
    }

    pub fn stages(
        &self,
        rtvars: &RuntimeVariables,
    ) -> SimulationStages {
        SimulationStages::new(rtvars, self.comparator(rtvars))
            .with_build_commands(BuildCommands::new(None, BUILD))
    }
}

pub fn write_file(
    path: &Path,
    content: &str,
) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn write_executable(
    path: &Path,
    content: &str,
) {
    write_file(path, content);
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// The Sod shock tube case of the fake tree
pub fn sod(name: &str) -> TestCaseSpec {
    let mut spec = TestCaseSpec {
        name: Some(name.into()),
        path: "Hydro".into(),
        source: "Hydro/Sod".into(),
        pre_scripts: vec!["pre.sh".into()],
        references: vec![
            TestReference::new("Xline.txt".into(), FileType::Text),
            TestReference::new("Record__Note".into(), FileType::Note),
        ],
        ..Default::default()
    };
    spec.options.insert("model".into(), "HYDRO".into());
    spec.inputs
        .entry("Input__Parameter".into())
        .or_default()
        .insert("END_T".into(), ConfigValue::Float(0.5));
    spec.levels.insert("level0".into(), 1e-10);
    spec
}
