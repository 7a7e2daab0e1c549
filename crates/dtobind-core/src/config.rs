//! Binder configuration
//!
//! Settings come from defaults, an optional JSON file and the environment, in
//! that order. String settings may reference environment variables as
//! `${ENV:NAME}`.

use crate::inspector::{AttributeBeanInspector, BeanInspector, XmlBeanInspector};
use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Conventional mapping document location, relative to the working directory
pub const DEFAULT_MAPPING_LOCATION: &str = "dtobind/mappings.xml";

/// Environment variable naming a mapping file; overrides the configured source
pub const ENV_MAPPING_FILE: &str = "DTOBIND_MAPPING_FILE";

/// Environment variable overriding `make_up_intermediates`
pub const ENV_MAKE_UP_INTERMEDIATES: &str = "DTOBIND_MAKE_UP_INTERMEDIATES";

/// Where binding metadata is read from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MappingSource {
    /// The conventional mapping file when it exists, descriptor attributes otherwise
    #[default]
    Auto,
    Attributes,
    XmlFile(PathBuf),
    XmlInline(String),
}

/// Settings of a [`crate::Binder`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Create missing intermediate objects when writing nested paths
    pub make_up_intermediates: bool,

    pub mapping: MappingSource,

    /// Inspect every type of an XML mapping while the binder is built
    pub eager_xml_inspection: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            make_up_intermediates: true,
            mapping: MappingSource::Auto,
            eager_xml_inspection: true,
        }
    }
}

impl BinderConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            message: format!("cannot read configuration {}", path.display()),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.expanded()
    }

    /// Apply environment overrides
    pub fn merge_with_env(mut self) -> Result<Self> {
        if let Ok(file) = std::env::var(ENV_MAPPING_FILE) {
            if !file.trim().is_empty() {
                self.mapping = MappingSource::XmlFile(PathBuf::from(file.trim()));
            }
        }
        if let Ok(flag) = std::env::var(ENV_MAKE_UP_INTERMEDIATES) {
            self.make_up_intermediates = parse_flag(&flag).ok_or_else(|| {
                Error::configuration(format!(
                    "{} must be true or false, got '{}'",
                    ENV_MAKE_UP_INTERMEDIATES, flag
                ))
            })?;
        }
        self.expanded()
    }

    pub fn with_mapping(mut self, mapping: MappingSource) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_make_up_intermediates(mut self, enabled: bool) -> Self {
        self.make_up_intermediates = enabled;
        self
    }

    /// Build the inspector the mapping source names
    pub fn inspector(&self) -> Result<Arc<dyn BeanInspector>> {
        let inspector: Arc<dyn BeanInspector> = match &self.mapping {
            MappingSource::Attributes => Arc::new(AttributeBeanInspector::new()),
            MappingSource::XmlFile(path) => Arc::new(XmlBeanInspector::from_file(path)?),
            MappingSource::XmlInline(xml) => Arc::new(XmlBeanInspector::from_xml(xml)?),
            MappingSource::Auto => {
                let conventional = Path::new(DEFAULT_MAPPING_LOCATION);
                if conventional.is_file() {
                    tracing::info!(path = DEFAULT_MAPPING_LOCATION, "using conventional mapping file");
                    Arc::new(XmlBeanInspector::from_file(conventional)?)
                } else {
                    Arc::new(AttributeBeanInspector::new())
                }
            }
        };
        Ok(inspector)
    }

    fn expanded(mut self) -> Result<Self> {
        self.mapping = match self.mapping {
            MappingSource::XmlFile(path) => {
                MappingSource::XmlFile(PathBuf::from(expand_env_vars(&path.to_string_lossy())?))
            }
            MappingSource::XmlInline(xml) => MappingSource::XmlInline(expand_env_vars(&xml)?),
            other => other,
        };
        Ok(self)
    }
}

/// Replace every `${ENV:NAME}` with the variable's value; an unset variable is an error
pub fn expand_env_vars(value: &str) -> Result<String> {
    let re = Regex::new(r"\$\{ENV:([^}]+)\}").map_err(|err| Error::Internal {
        message: "invalid environment reference pattern".to_string(),
        source: err.into(),
    })?;

    let mut result = value.to_string();
    for cap in re.captures_iter(value) {
        let var_name = &cap[1];
        let env_value = std::env::var(var_name).map_err(|_| {
            Error::configuration(format!("environment variable {} not found", var_name))
        })?;
        result = result.replace(&cap[0], &env_value);
    }
    Ok(result)
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
