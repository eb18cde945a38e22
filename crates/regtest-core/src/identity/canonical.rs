//! Canonical form of case content
//!
//! Mappings become key-sorted association lists, sequences keep their
//! order, records are mappings of their field names. Only types
//! implementing [`Canonicalize`] can take part, so an unsupported value is
//! rejected when the code is compiled rather than when a case is built.

use crate::error::CanonicalError;
use indexmap::IndexMap;
use serde::{
    Serialize,
    Serializer,
    ser::{
        SerializeMap,
        SerializeSeq,
    },
};
use std::collections::{
    BTreeMap,
    HashMap,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Canonical {
    Null,
    Bool(bool),
    Int(i64),
    /// Always finite
    Float(f64),
    Str(String),
    Seq(Vec<Canonical>),
    /// Entries sorted by key, keys unique
    Assoc(Vec<(String, Canonical)>),
}

impl Canonical {
    /// Build an association list from unordered entries.
    pub fn assoc(
        entries: impl IntoIterator<Item = (String, Canonical)>
    ) -> Result<Self, CanonicalError> {
        let mut entries: Vec<_> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(pair) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(CanonicalError::KeyCollision(pair[0].0.clone()));
        }
        Ok(Canonical::Assoc(entries))
    }

    pub fn float(value: f64) -> Result<Self, CanonicalError> {
        if value.is_finite() {
            Ok(Canonical::Float(value))
        } else {
            Err(CanonicalError::NonFinite {
                path: String::new(),
                value,
            })
        }
    }

    /// Compact encoding with sorted keys
    pub fn to_json(&self) -> String {
        // serializing this enum into a String cannot fail: keys are strings
        // and floats are finite
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for Canonical {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match self {
            Canonical::Null => serializer.serialize_unit(),
            Canonical::Bool(b) => serializer.serialize_bool(*b),
            Canonical::Int(i) => serializer.serialize_i64(*i),
            Canonical::Float(f) => serializer.serialize_f64(*f),
            Canonical::Str(s) => serializer.serialize_str(s),
            Canonical::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            },
            Canonical::Assoc(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            },
        }
    }
}

/// Conversion into the canonical form used for fingerprints
pub trait Canonicalize {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError>;
}

/// Helper for records: canonicalize named fields into an association list.
pub fn record(
    fields: impl IntoIterator<Item = (&'static str, Result<Canonical, CanonicalError>)>
) -> Result<Canonical, CanonicalError> {
    let entries = fields
        .into_iter()
        .map(|(name, value)| {
            value
                .map(|v| (name.to_string(), v))
                .map_err(|err| at_path(err, name))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Canonical::assoc(entries)
}

fn at_path(
    err: CanonicalError,
    segment: &str,
) -> CanonicalError {
    match err {
        CanonicalError::NonFinite { path, value } => CanonicalError::NonFinite {
            path: if path.is_empty() {
                segment.to_string()
            } else {
                format!("{}.{}", segment, path)
            },
            value,
        },
        other => other,
    }
}

impl Canonicalize for bool {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        Ok(Canonical::Bool(*self))
    }
}

macro_rules! canonical_int {
    ($($ty:ty),*) => {
        $(
            impl Canonicalize for $ty {
                fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
                    Ok(Canonical::Int(i64::from(*self)))
                }
            }
        )*
    };
}

canonical_int!(i8, i16, i32, i64, u8, u16, u32);

impl Canonicalize for f64 {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        Canonical::float(*self)
    }
}

impl Canonicalize for str {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        Ok(Canonical::Str(self.to_string()))
    }
}

impl Canonicalize for String {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        self.as_str().canonicalize()
    }
}

impl<T: Canonicalize> Canonicalize for Option<T> {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        match self {
            Some(value) => value.canonicalize(),
            None => Ok(Canonical::Null),
        }
    }
}

impl<T: Canonicalize> Canonicalize for [T] {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        self.iter()
            .enumerate()
            .map(|(i, item)| {
                item.canonicalize().map_err(|e| at_path(e, &i.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Canonical::Seq)
    }
}

impl<T: Canonicalize> Canonicalize for Vec<T> {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        self.as_slice().canonicalize()
    }
}

fn canonicalize_entries<'a, K, V>(
    entries: impl Iterator<Item = (&'a K, &'a V)>
) -> Result<Canonical, CanonicalError>
where
    K: ToString + 'a,
    V: Canonicalize + 'a,
{
    let entries = entries
        .map(|(key, value)| {
            let key = key.to_string();
            value
                .canonicalize()
                .map_err(|e| at_path(e, &key))
                .map(|v| (key, v))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Canonical::assoc(entries)
}

impl<K: ToString, V: Canonicalize> Canonicalize for BTreeMap<K, V> {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        canonicalize_entries(self.iter())
    }
}

impl<K: ToString, V: Canonicalize, S> Canonicalize for HashMap<K, V, S> {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        canonicalize_entries(self.iter())
    }
}

impl<K: ToString, V: Canonicalize, S> Canonicalize for IndexMap<K, V, S> {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        canonicalize_entries(self.iter())
    }
}
