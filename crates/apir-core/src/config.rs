use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::transform::spec_to_ir::{DEFAULT_BASE_SCHEMA, DEFAULT_FAMILY, DEFAULT_METADATA_PREFIX};
use crate::transform::{FilterRule, RequiredMode, TransformOptions};

/// Top-level project configuration loaded from `.apir.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApirConfig {
    pub input: String,
    /// Content-type families, most preferred first.
    pub families: Vec<String>,
    pub required_mode: RequiredMode,
    /// Catalog names to select even when no operation reaches them.
    pub schemas: Vec<String>,
    pub filters: FilterConfig,
    pub protocol: ProtocolConfig,
}

impl Default for ApirConfig {
    fn default() -> Self {
        Self {
            input: "openapi.yaml".to_string(),
            families: vec![DEFAULT_FAMILY.to_string()],
            required_mode: RequiredMode::Spec,
            schemas: Vec::new(),
            filters: FilterConfig::default(),
            protocol: ProtocolConfig::default(),
        }
    }
}

/// Include/exclude rules over raw catalog names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub include: Vec<FilterSpec>,
    pub exclude: Vec<FilterSpec>,
}

/// One filter rule as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSpec {
    /// Regular expression matched anywhere in the name.
    Pattern(String),
    /// Plain substring.
    Contains(String),
}

impl FilterSpec {
    pub fn to_rule(&self) -> Result<FilterRule, ConfigError> {
        match self {
            FilterSpec::Pattern(pattern) => Ok(FilterRule::pattern(pattern)?),
            FilterSpec::Contains(needle) => Ok(FilterRule::substring(needle.as_str())),
        }
    }
}

/// Names reserved by the content family's protocol.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Catalog names starting with this prefix are metadata, never models.
    pub metadata_prefix: String,
    /// The one base schema an `allOf` may flatten into its children.
    pub base_schema: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            metadata_prefix: DEFAULT_METADATA_PREFIX.to_string(),
            base_schema: DEFAULT_BASE_SCHEMA.to_string(),
        }
    }
}

impl ApirConfig {
    /// Convert into pipeline options, compiling filter patterns.
    pub fn to_options(&self) -> Result<TransformOptions, ConfigError> {
        let compile = |specs: &[FilterSpec]| -> Result<Vec<FilterRule>, ConfigError> {
            specs.iter().map(FilterSpec::to_rule).collect()
        };
        Ok(TransformOptions {
            required_mode: self.required_mode,
            families: self.families.clone(),
            schemas: self.schemas.clone(),
            include: compile(&self.filters.include)?,
            exclude: compile(&self.filters.exclude)?,
            metadata_prefix: self.protocol.metadata_prefix.clone(),
            base_schema: self.protocol.base_schema.clone(),
        })
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".apir.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<ApirConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: ApirConfig = serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# apir configuration
input: openapi.yaml

families:                 # most preferred first
  - application/ld+json
  # - application/vnd.api+json
  # - application/json

required_mode: spec       # spec | all

schemas: []               # extra catalog names to model even if unused
  # - Book.jsonld-book.read

filters:
  include: []
    # - pattern: "^Book"
  exclude: []
    # - contains: ".jsonMergePatch"

protocol:
  metadata_prefix: Hydra
  base_schema: HydraItemBaseSchema
"#
}
