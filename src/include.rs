//! Loading of YAML document streams with `!include` expansion.
//!
//! An include may stand for a whole document or for any single value inside
//! a document. Paths resolve relative to the including file. Cycles are
//! detected against the set of files open on the current inclusion chain; the
//! set is copied on recursion, so sibling branches may include the same file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value as Yaml;
use tracing::debug;

use crate::errors::SetupError;

/// Tag marking an include directive.
pub const INCLUDE_TAG: &str = "!include";

/// Canonical paths of the files open on the active inclusion chain.
pub type OpenSet = im::HashSet<PathBuf>;

/// The resolved content of one file.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Single(Yaml),
    Multi(Vec<Yaml>),
}

impl Loaded {
    /// Value form, used when the include stands for a field.
    pub fn into_value(self) -> Yaml {
        match self {
            Loaded::Single(doc) => doc,
            Loaded::Multi(docs) => Yaml::Sequence(docs),
        }
    }

    pub fn into_documents(self) -> Vec<Yaml> {
        match self {
            Loaded::Single(doc) => vec![doc],
            Loaded::Multi(docs) => docs,
        }
    }
}

/// Loads `path` and expands every include it reaches.
pub fn load(path: &Path, open: &OpenSet) -> Result<Loaded, SetupError> {
    load_file(path, open, None)
}

/// Loads `path` as a flat document stream ready for normalization.
pub fn load_stream(path: &Path) -> Result<Vec<Yaml>, SetupError> {
    let documents = load(path, &OpenSet::new())?.into_documents();
    Ok(flatten_documents(documents))
}

/// Splices document-level sequences into the stream until none remain.
pub fn flatten_documents(documents: Vec<Yaml>) -> Vec<Yaml> {
    let mut flat = Vec::with_capacity(documents.len());
    for document in documents {
        match document {
            Yaml::Sequence(items) => flat.extend(flatten_documents(items)),
            other => flat.push(other),
        }
    }
    flat
}

/// Splits YAML text into its `---` separated documents.
pub fn parse_documents(text: &str, path: &Path) -> Result<Vec<Yaml>, SetupError> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Yaml::deserialize(document).map_err(|source| SetupError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        documents.push(value);
    }
    Ok(documents)
}

// ============================================================================
// INTERNAL RESOLUTION
// ============================================================================

struct Frame<'a> {
    file: &'a Path,
    dir: &'a Path,
    open: &'a OpenSet,
}

fn load_file(path: &Path, open: &OpenSet, referrer: Option<&Path>) -> Result<Loaded, SetupError> {
    let canonical = fs::canonicalize(path).map_err(|source| match referrer {
        Some(from) => SetupError::IncludeNotFound {
            path: path.to_path_buf(),
            from: from.to_path_buf(),
        },
        None => SetupError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    if open.contains(&canonical) {
        return Err(SetupError::CircularInclusion { path: canonical });
    }
    let open = open.update(canonical.clone());

    debug!(file = %canonical.display(), depth = open.len(), "loading document source");
    let text = fs::read_to_string(&canonical).map_err(|source| SetupError::Io {
        path: canonical.clone(),
        source,
    })?;

    let dir = canonical.parent().unwrap_or_else(|| Path::new("/"));
    let frame = Frame {
        file: &canonical,
        dir,
        open: &open,
    };

    let mut documents = Vec::new();
    for document in parse_documents(&text, &canonical)? {
        match include_target(&document, frame.file)? {
            Some(target) => documents.extend(frame.include(target)?.into_documents()),
            None => documents.push(frame.resolve(document)?),
        }
    }

    Ok(match documents.len() {
        1 => Loaded::Single(documents.remove(0)),
        _ => Loaded::Multi(documents),
    })
}

impl Frame<'_> {
    fn include(&self, target: &str) -> Result<Loaded, SetupError> {
        let path = self.dir.join(target);
        debug!(from = %self.file.display(), include = %path.display(), "expanding include");
        load_file(&path, self.open, Some(self.file))
    }

    fn resolve(&self, node: Yaml) -> Result<Yaml, SetupError> {
        if let Some(target) = include_target(&node, self.file)? {
            return Ok(self.include(target)?.into_value());
        }
        match node {
            Yaml::Sequence(items) => items
                .into_iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Yaml::Sequence),
            Yaml::Mapping(mapping) => {
                let mut resolved = serde_yaml::Mapping::with_capacity(mapping.len());
                for (key, value) in mapping {
                    resolved.insert(key, self.resolve(value)?);
                }
                Ok(Yaml::Mapping(resolved))
            }
            Yaml::Tagged(mut tagged) => {
                tagged.value = self.resolve(tagged.value)?;
                Ok(Yaml::Tagged(tagged))
            }
            scalar => Ok(scalar),
        }
    }
}

/// Returns the include path when `node` is an include directive.
fn include_target<'a>(node: &'a Yaml, file: &Path) -> Result<Option<&'a str>, SetupError> {
    let Yaml::Tagged(tagged) = node else {
        return Ok(None);
    };
    if tagged.tag != INCLUDE_TAG {
        return Ok(None);
    }
    match &tagged.value {
        Yaml::String(target) => Ok(Some(target.as_str())),
        other => Err(SetupError::InvalidInclude {
            from: file.to_path_buf(),
            found: describe(other).to_string(),
        }),
    }
}

fn describe(node: &Yaml) -> &'static str {
    match node {
        Yaml::Null => "null",
        Yaml::Bool(_) => "a boolean",
        Yaml::Number(_) => "a number",
        Yaml::String(_) => "a string",
        Yaml::Sequence(_) => "a sequence",
        Yaml::Mapping(_) => "a mapping",
        Yaml::Tagged(_) => "a tagged value",
    }
}
