//! TOML list of the cases of a run
//!
//! ```toml
//! [remote]
//! root_folder_id = "64f1b5cd5545e01fe3479259"
//!
//! [[cases]]
//! name = "sod"
//! path = "Hydro/Riemann"
//! source = "Riemann"
//! priority = "high"
//! tags = ["hydro"]
//! references = [{ name = "Xline_y0.000.txt", file_type = "TEXT" }]
//!
//! [cases.options]
//! model = "HYDRO"
//!
//! [cases.inputs.Input__TestProb]
//! Riemann_Prob = 0
//!
//! [cases.levels]
//! level0 = 0.0
//! ```

use anyhow::{
    Context,
    Result,
};
use regtest_core::{
    IdentityRegistry,
    RemoteSettings,
    TestCase,
    TestCaseSpec,
};
use serde::Deserialize;
use std::{
    fs,
    path::Path,
};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub cases: Vec<TestCaseSpec>,
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading case manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing case manifest {}", path.display()))
    }

    /// Register every case in manifest order.
    pub fn build_cases(
        self,
        registry: &mut IdentityRegistry,
    ) -> Result<Vec<TestCase>> {
        self.cases
            .into_iter()
            .map(|spec| Ok(spec.build(registry)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use regtest_core::{
        ConfigValue,
        FileType,
        Priority,
    };

    const MANIFEST: &str = r#"
[[cases]]
name = "sod"
path = "Hydro/Riemann"
source = "Riemann"
priority = "high"
tags = ["hydro"]
references = [{ name = "Xline_y0.000.txt", file_type = "TEXT" }]

[cases.options]
model = "HYDRO"
double = true

[cases.inputs.Input__TestProb]
Riemann_Prob = 0

[cases.levels]
level0 = 0.0
level1 = 1e-12

[[cases]]
path = "Hydro/Riemann"
source = "Riemann"
priority = 15
"#;

    #[test]
    fn cases_keep_manifest_order() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.remote, RemoteSettings::default());
        let cases = manifest.build_cases(&mut IdentityRegistry::new()).unwrap();

        assert_eq!(cases.len(), 2);
        let sod = &cases[0];
        assert_eq!(sod.test_id(), "Hydro/Riemann/sod");
        assert_eq!(sod.priority(), Priority::HIGH);
        assert_eq!(sod.options()["double"], ConfigValue::Bool(true));
        assert_eq!(sod.inputs()["Input__TestProb"]["Riemann_Prob"], ConfigValue::Int(0));
        assert_eq!(sod.references()[0].file_type, FileType::Text);
        assert_eq!(sod.tolerance(1), Some(1e-12));

        let unnamed = &cases[1];
        assert_eq!(unnamed.priority(), Priority(15));
        assert_eq!(
            unnamed.test_id(),
            format!("Hydro/Riemann/case_{}", unnamed.fingerprint())
        );
    }

    #[test]
    fn duplicate_cases_are_rejected() {
        let manifest = Manifest::parse(
            "[[cases]]\nname = \"a\"\npath = \"X\"\n[[cases]]\nname = \"a\"\npath = \"X\"\n",
        )
        .unwrap();
        assert!(manifest.build_cases(&mut IdentityRegistry::new()).is_err());
    }

    #[test]
    fn unknown_fields_are_errors() {
        assert!(Manifest::parse("[[cases]]\nnmae = \"typo\"\n").is_err());
    }
}
