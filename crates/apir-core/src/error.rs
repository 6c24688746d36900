use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("requested schema not found in catalog: {0}")]
    UnknownSchema(String),

    #[error("requested schemas need at least one content-type family: {}", .0.join(", "))]
    SchemasWithoutFamily(Vec<String>),

    #[error("filters selected no schemas for families [{}]", .families.join(", "))]
    EmptySelection { families: Vec<String> },
}
