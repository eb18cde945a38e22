//! Strict in-place editing of simulation input files
//!
//! Only active lines are considered: blank lines and lines whose first
//! non-space character is `#` are invisible. For each key the first active
//! line of the form `KEY <value> [rest]` has its value token replaced; a
//! trailing `#` comment keeps its column where the padding allows. If any
//! key cannot be found the file is left untouched.

use crate::case::ConfigValue;
use indexmap::IndexMap;
use regex::Regex;
use std::{
    fs,
    io,
    path::{
        Path,
        PathBuf,
    },
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputEditError {
    #[error("Missing input file {}.", .0.display())]
    MissingFile(PathBuf),
    #[error("Keys not found in {}: {}", path.display(), keys.join(", "))]
    MissingKeys { path: PathBuf, keys: Vec<String> },
    #[error("Error on editing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Rewrite the value of one active line, keeping the comment column.
fn rewrite_line(
    line: &str,
    pattern: &Regex,
    key: &str,
    value: &str,
) -> Option<String> {
    let caps = pattern.captures(line)?;
    let indent = &caps[1];
    let gap = &caps[2];
    let old = &caps[3];
    let rest = &caps[4];
    let rest = match rest.split_once('#') {
        Some((before, after)) => {
            let diff = value.chars().count() as isize - old.chars().count() as isize;
            let padding = before.chars().count() as isize;
            let before = if diff > 0 {
                if padding > diff {
                    before.chars().skip(diff as usize).collect::<String>()
                } else {
                    " ".to_string()
                }
            } else {
                format!("{}{}", before, " ".repeat((-diff) as usize))
            };
            format!("{}#{}", before, after)
        },
        None => rest.to_string(),
    };
    Some(format!("{}{}{}{}{}\n", indent, key, gap, value, rest))
}

/// Apply `settings` to the lines of an input file.
///
/// Returns the edited text, or the keys that have no active line.
pub fn edit_lines(
    content: &str,
    settings: &IndexMap<String, ConfigValue>,
) -> Result<String, Vec<String>> {
    let mut lines: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
    let mut missing = Vec::new();
    for (key, value) in settings {
        let pattern = Regex::new(&format!(r"^(\s*){}(\s+)(\S+)(.*)$", regex::escape(key)))
            .map_err(|_| vec![key.clone()])?;
        let value = value.to_string();
        let edited = lines.iter().enumerate().find_map(|(idx, line)| {
            let stripped = line.trim_start();
            if stripped.trim_end().is_empty()
                || stripped.starts_with('#')
                || !stripped.starts_with(key.as_str())
            {
                return None;
            }
            let body = line.strip_suffix('\n').unwrap_or(line);
            rewrite_line(body, &pattern, key, &value).map(|new| (idx, new))
        });
        match edited {
            Some((idx, new)) => lines[idx] = new,
            None => missing.push(key.clone()),
        }
    }
    if missing.is_empty() {
        Ok(lines.concat())
    } else {
        Err(missing)
    }
}

/// Edit the file at `path` in place.
pub fn edit_input_file(
    path: &Path,
    settings: &IndexMap<String, ConfigValue>,
) -> Result<(), InputEditError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(InputEditError::MissingFile(path.to_path_buf()));
        },
        Err(source) => {
            return Err(InputEditError::Io {
                path: path.to_path_buf(),
                source,
            });
        },
    };
    let edited = edit_lines(&content, settings).map_err(|keys| {
        InputEditError::MissingKeys {
            path: path.to_path_buf(),
            keys,
        }
    })?;
    fs::write(path, edited).map_err(|source| InputEditError::Io {
        path: path.to_path_buf(),
        source,
    })
}
