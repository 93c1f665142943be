//! Engine configuration.
//!
//! Controls the choices the resolver makes when a schema is ambiguous or
//! lossy to compile. Every field has a default, so an empty file is valid.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! resolve:
//!   ref_siblings: merge
//!   combine_all_of: true
//!   relocate_array_required: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What to do with keywords written next to a `$ref` that gets inlined.
///
/// Container and annotation keywords (`definitions`, `$defs`, `$schema`,
/// `$id`, `id`, `$comment`) are always kept; the policy applies to the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefSiblingPolicy {
    /// Merge the siblings into the resolved target.
    #[default]
    Merge,
    /// Drop the siblings and record a
    /// [`Diagnostic::DroppedRefSiblings`](crate::Diagnostic::DroppedRefSiblings).
    Ignore,
    /// Fail with [`EngineError::RefWithSiblings`](crate::EngineError::RefWithSiblings).
    Reject,
}

/// Options for [`ReferenceResolver`](crate::ReferenceResolver) and
/// [`SubschemaResolver`](crate::SubschemaResolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Handling of `$ref` sibling keywords.
    pub ref_siblings: RefSiblingPolicy,
    /// Fold `allOf` arrays into their parent schema.
    pub combine_all_of: bool,
    /// Move a `required` list written on an array schema into its item
    /// schema.
    pub relocate_array_required: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            ref_siblings: RefSiblingPolicy::Merge,
            combine_all_of: true,
            relocate_array_required: true,
        }
    }
}

/// Top-level engine configuration.
///
/// # Examples
///
/// ```
/// use form_schema_core::{EngineConfig, RefSiblingPolicy};
///
/// let config = EngineConfig::from_yaml_str("resolve:\n  ref_siblings: reject\n").unwrap();
/// assert_eq!(config.version, "1.0");
/// assert_eq!(config.resolve.ref_siblings, RefSiblingPolicy::Reject);
/// assert!(config.resolve.combine_all_of);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Configuration format version.
    pub version: String,
    /// Resolver behavior.
    pub resolve: ResolveOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            resolve: ResolveOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a file. Files ending in `.json` are read as
    /// JSON, everything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::EngineError::Io) if the file cannot be read,
    /// or [`Yaml`](crate::EngineError::Yaml) / [`Json`](crate::EngineError::Json)
    /// if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(std::fs::File::open(path)?);
        let config = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Saves the configuration, as JSON for `.json` paths and YAML otherwise.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(std::fs::File::create(path)?);
        if is_json(path) {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_yaml::to_writer(writer, self)?;
        }
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
