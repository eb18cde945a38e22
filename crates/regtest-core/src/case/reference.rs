use crate::{
    error::CanonicalError,
    identity::{
        Canonical,
        Canonicalize,
        record,
    },
};
use derive_new::new;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// Comparison strategy for a produced artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    /// Whitespace-delimited numeric table
    Text,
    /// Binary snapshot compared by the external compare tool
    Hdf5,
    /// Run-metadata report (`Record__Note`)
    Note,
}

impl FileType {
    pub fn name(self) -> &'static str {
        match self {
            FileType::Text => "TEXT",
            FileType::Hdf5 => "HDF5",
            FileType::Note => "NOTE",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Canonicalize for FileType {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        self.name().canonicalize()
    }
}

/// A produced artifact and how to compare it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
pub struct TestReference {
    pub name: String,
    pub file_type: FileType,
}

impl TestReference {
    /// File name of the artifact inside run and reference directories
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

impl Canonicalize for TestReference {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        record([
            ("name", self.name.canonicalize()),
            ("file_type", self.file_type.canonicalize()),
        ])
    }
}
