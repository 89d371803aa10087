//! Error types for supabase_provider.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Configuration file errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors raised while building the Supabase clients.
#[derive(Error, Diagnostic, Debug)]
pub enum ProviderError {
    /// A required configuration value is absent or empty.
    #[error("Missing required configuration value: {key}")]
    #[diagnostic(
        code(supabase_provider::missing_config),
        help("Set {key} in the environment, a .env file, or the config file")
    )]
    MissingConfig { key: String },

    #[error("Invalid Supabase URL '{value}'")]
    #[diagnostic(
        code(supabase_provider::invalid_url),
        help("Expected an absolute URL such as https://<project>.supabase.co")
    )]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme '{scheme}' in '{value}'")]
    #[diagnostic(
        code(supabase_provider::unsupported_scheme),
        help("Supabase endpoints are served over http or https")
    )]
    UnsupportedScheme { value: String, scheme: String },

    /// The key can't be sent as a header value.
    #[error("Invalid key for {key}: {reason}")]
    #[diagnostic(code(supabase_provider::invalid_key))]
    InvalidKey { key: String, reason: String },

    /// A configuration value is set but can't be used.
    #[error("Invalid configuration value for {key}")]
    #[diagnostic(code(supabase_provider::invalid_config))]
    InvalidConfig {
        key: String,
        #[source]
        cause: ConfigError,
    },

    #[error("Invalid schema '{schema}': {reason}")]
    #[diagnostic(
        code(supabase_provider::invalid_schema),
        help("The schema name is sent in the Accept-Profile and Content-Profile headers")
    )]
    InvalidSchema { schema: String, reason: String },

    #[error("Failed to load configuration from {path}")]
    #[diagnostic(code(supabase_provider::config_file))]
    ConfigFile {
        path: String,
        #[source]
        cause: ConfigError,
    },

    /// HTTP client construction or request failure.
    #[error("HTTP error: {0}")]
    #[diagnostic(code(supabase_provider::http))]
    Http(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingConfig { key: key.into() }
    }
}
