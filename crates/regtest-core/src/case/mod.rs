//! Test case model and construction

mod priority;
mod reference;
mod value;

pub use priority::Priority;
pub use reference::{
    FileType,
    TestReference,
};
pub use value::ConfigValue;

use crate::{
    build_cache::TOOLS_DIR,
    error::{
        CanonicalError,
        CaseError,
    },
    identity::{
        self,
        Canonical,
        Canonicalize,
        IdentityRegistry,
        record,
    },
};
use indexmap::IndexMap;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    fmt,
};

/// Build options passed to the configuration script, in declaration order
pub type BuildOptions = IndexMap<String, ConfigValue>;

/// Input-file overrides keyed by file name (`Input__Parameter`, ...)
pub type InputOverrides = IndexMap<String, IndexMap<String, ConfigValue>>;

/// Declarative description of a case, as read from a manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestCaseSpec {
    /// Explicit case name; `case_<fingerprint>` when absent
    pub name: Option<String>,
    /// Grouping path, e.g. `Hydro/Riemann`
    pub path: String,
    /// Test problem directory under `example/test_problem`
    pub source: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub options: BuildOptions,
    pub inputs: InputOverrides,
    pub pre_scripts: Vec<String>,
    pub post_scripts: Vec<String>,
    pub user_compare_scripts: Vec<String>,
    pub references: Vec<TestReference>,
    /// Tolerances keyed `level0`, `level1`, ...
    pub levels: BTreeMap<String, f64>,
}

impl TestCaseSpec {
    /// Fingerprint the case, derive its `test_id` and register it.
    pub fn build(
        self,
        registry: &mut IdentityRegistry,
    ) -> Result<TestCase, CaseError> {
        let fingerprint = identity::fingerprint(&self)?;
        let case_name = match &self.name {
            Some(name) => name.clone(),
            None => format!("case_{}", fingerprint),
        };
        let test_id = if self.path.is_empty() {
            case_name
        } else {
            format!("{}/{}", self.path.trim_end_matches('/'), case_name)
        };
        if test_id.split('/').next() == Some(TOOLS_DIR) {
            return Err(CaseError::ReservedPath(test_id));
        }
        registry.register(&test_id)?;
        Ok(TestCase {
            spec: self,
            test_id,
            fingerprint,
        })
    }
}

impl Canonicalize for TestCaseSpec {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        record([
            ("name", self.name.canonicalize()),
            ("path", self.path.canonicalize()),
            ("source", self.source.canonicalize()),
            ("priority", self.priority.0.canonicalize()),
            ("tags", self.tags.canonicalize()),
            ("options", self.options.canonicalize()),
            ("inputs", self.inputs.canonicalize()),
            ("pre_scripts", self.pre_scripts.canonicalize()),
            ("post_scripts", self.post_scripts.canonicalize()),
            ("user_compare_scripts", self.user_compare_scripts.canonicalize()),
            ("references", self.references.canonicalize()),
            ("levels", self.levels.canonicalize()),
        ])
    }
}

/// An immutable, registered test case
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    spec: TestCaseSpec,
    test_id: String,
    fingerprint: String,
}

impl TestCase {
    /// `path/(name or case_<fingerprint>)`, unique within a run
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn definition(&self) -> &TestCaseSpec {
        &self.spec
    }

    pub fn name(&self) -> Option<&str> {
        self.spec.name.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.spec.path
    }

    pub fn source(&self) -> &str {
        &self.spec.source
    }

    pub fn priority(&self) -> Priority {
        self.spec.priority
    }

    pub fn tags(&self) -> &[String] {
        &self.spec.tags
    }

    pub fn options(&self) -> &BuildOptions {
        &self.spec.options
    }

    pub fn option_enabled(
        &self,
        key: &str,
    ) -> bool {
        self.spec.options.get(key).is_some_and(ConfigValue::is_truthy)
    }

    pub fn inputs(&self) -> &InputOverrides {
        &self.spec.inputs
    }

    pub fn pre_scripts(&self) -> &[String] {
        &self.spec.pre_scripts
    }

    pub fn post_scripts(&self) -> &[String] {
        &self.spec.post_scripts
    }

    pub fn user_compare_scripts(&self) -> &[String] {
        &self.spec.user_compare_scripts
    }

    pub fn references(&self) -> &[TestReference] {
        &self.spec.references
    }

    pub fn has_references_of(
        &self,
        file_type: FileType,
    ) -> bool {
        self.spec.references.iter().any(|r| r.file_type == file_type)
    }

    /// Tolerance for the given error level (`levels["level<n>"]`)
    pub fn tolerance(
        &self,
        error_level: u8,
    ) -> Option<f64> {
        self.spec.levels.get(&format!("level{}", error_level)).copied()
    }

    /// Last component of the `test_id`
    pub fn case_folder(&self) -> &str {
        self.test_id.rsplit('/').next().unwrap_or(&self.test_id)
    }

    /// Grouping path with separators removed, as used by the remote store
    pub fn group_name(&self) -> String {
        self.spec.path.replace('/', "")
    }

    /// Whether the case has every tag in `required`
    pub fn has_tags(
        &self,
        required: &[String],
    ) -> bool {
        required.iter().all(|tag| self.spec.tags.contains(tag))
    }
}

impl fmt::Display for TestCase {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "TestCase<{}>", self.test_id)
    }
}

/// Cases with at least `min_priority` that carry every tag in `tags`,
/// keeping their order.
pub fn select_cases(
    cases: Vec<TestCase>,
    min_priority: Priority,
    tags: &[String],
) -> Vec<TestCase> {
    cases
        .into_iter()
        .filter(|case| case.priority() >= min_priority && case.has_tags(tags))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdentityError;
    use pretty_assertions::assert_eq;

    fn riemann() -> TestCaseSpec {
        let mut case = TestCaseSpec {
            path: "Hydro/Riemann".into(),
            source: "Hydro/Riemann".into(),
            priority: Priority::HIGH,
            tags: vec!["hydro".into(), "cpu".into()],
            references: vec![TestReference::new("Data_000001".into(), FileType::Hdf5)],
            ..Default::default()
        };
        case.options.insert("model".into(), "HYDRO".into());
        case.options.insert("double".into(), true.into());
        case.levels.insert("level0".into(), 0.0);
        case.levels.insert("level1".into(), 1e-12);
        case
    }

    #[test]
    fn fingerprint_ignores_insertion_order() {
        let forward = riemann();
        let mut backward = riemann();
        backward.options.clear();
        backward.options.insert("double".into(), true.into());
        backward.options.insert("model".into(), "HYDRO".into());
        assert_ne!(
            forward.options.keys().collect::<Vec<_>>(),
            backward.options.keys().collect::<Vec<_>>()
        );

        let a = forward.build(&mut IdentityRegistry::new()).unwrap();
        let b = backward.build(&mut IdentityRegistry::new()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.test_id(), b.test_id());
    }

    #[test]
    fn fingerprint_tracks_semantic_changes() {
        let a = riemann().build(&mut IdentityRegistry::new()).unwrap();
        let mut changed = riemann();
        changed.levels.insert("level0".into(), 1e-10);
        let b = changed.build(&mut IdentityRegistry::new()).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_id_uses_name_or_fingerprint() {
        let mut registry = IdentityRegistry::new();
        let anonymous = riemann().build(&mut registry).unwrap();
        assert_eq!(
            anonymous.test_id(),
            format!("Hydro/Riemann/case_{}", anonymous.fingerprint())
        );
        assert_eq!(anonymous.case_folder(), format!("case_{}", anonymous.fingerprint()));

        let mut named = riemann();
        named.name = Some("sod".into());
        let named = named.build(&mut registry).unwrap();
        assert_eq!(named.test_id(), "Hydro/Riemann/sod");
        assert_eq!(named.group_name(), "HydroRiemann");
    }

    #[test]
    fn duplicate_identity_is_rejected_until_renamed() {
        let mut registry = IdentityRegistry::new();
        let first = riemann().build(&mut registry).unwrap();
        let err = riemann().build(&mut registry).unwrap_err();
        assert_eq!(
            err,
            CaseError::Identity(IdentityError::Duplicate(first.test_id().to_string()))
        );

        let mut renamed = riemann();
        renamed.name = Some("sod_again".into());
        assert!(renamed.build(&mut registry).is_ok());
    }

    #[test]
    fn cases_cannot_live_in_the_tool_cache() {
        let mut registry = IdentityRegistry::new();
        let mut clash = riemann();
        clash.path = "tools".into();
        clash.name = Some("sod".into());
        assert_eq!(
            clash.build(&mut registry).unwrap_err(),
            CaseError::ReservedPath("tools/sod".into())
        );

        let mut nested = riemann();
        nested.path = "Hydro/tools".into();
        nested.name = Some("sod".into());
        assert_eq!(nested.build(&mut registry).unwrap().test_id(), "Hydro/tools/sod");
    }

    #[test]
    fn non_finite_tolerance_is_rejected() {
        let mut bad = riemann();
        bad.levels.insert("level2".into(), f64::INFINITY);
        assert!(matches!(
            bad.build(&mut IdentityRegistry::new()),
            Err(CaseError::Canonical(CanonicalError::NonFinite { .. }))
        ));
    }

    #[test]
    fn selection_by_priority_and_tags() {
        let mut registry = IdentityRegistry::new();
        let mut low = riemann();
        low.name = Some("low".into());
        low.priority = Priority::LOW;
        let mut gpu = riemann();
        gpu.name = Some("gpu".into());
        gpu.tags = vec!["hydro".into(), "gpu".into()];
        let cases = vec![
            riemann().build(&mut registry).unwrap(),
            low.build(&mut registry).unwrap(),
            gpu.build(&mut registry).unwrap(),
        ];

        let selected = select_cases(cases.clone(), Priority::HIGH, &[]);
        assert_eq!(selected.len(), 2);

        let selected = select_cases(cases, Priority::LOW, &["gpu".to_string()]);
        assert_eq!(
            selected.iter().map(TestCase::test_id).collect::<Vec<_>>(),
            vec!["Hydro/Riemann/gpu"]
        );
    }

    #[test]
    fn tolerance_lookup_by_level() {
        let case = riemann().build(&mut IdentityRegistry::new()).unwrap();
        assert_eq!(case.tolerance(1), Some(1e-12));
        assert_eq!(case.tolerance(2), None);
        assert!(case.option_enabled("double"));
        assert!(!case.option_enabled("mpi"));
    }

    #[test]
    fn manifest_entry_deserializes() {
        let entry: TestCaseSpec = serde_json::from_str(
            r#"{
                "path": "Hydro/Blast",
                "source": "Hydro/BlastWave",
                "priority": "medium",
                "options": {"model": "HYDRO", "mpi": true},
                "inputs": {"Input__Parameter": {"END_T": 0.1}},
                "references": [{"name": "Record__Note", "file_type": "NOTE"}],
                "levels": {"level0": 0.0}
            }"#,
        )
        .unwrap();
        assert_eq!(entry.priority, Priority::MEDIUM);
        assert_eq!(entry.references[0].file_type, FileType::Note);
        assert_eq!(
            entry.inputs["Input__Parameter"]["END_T"],
            ConfigValue::Float(0.1)
        );
    }
}
