//! Configuration sources for the Supabase clients
//!
//! The provider only needs three values. Where they come from is abstracted
//! behind [`ConfigSource`], so the process environment, a TOML file, or an
//! in-memory map can all feed the same startup path.

use std::collections::HashMap;
use std::env::VarError;
use std::path::Path;

use tracing::debug;
use url::Url;

use crate::error::{ConfigError, ProviderError, ProviderResult};

/// Endpoint URL of the Supabase project.
pub const SUPABASE_URL: &str = "SUPABASE_URL";
/// Public key, subject to row-level security.
pub const SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
/// Privileged key, bypasses row-level security.
pub const SUPABASE_SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
/// Optional Postgres schema for REST requests.
pub const SUPABASE_DB_SCHEMA: &str = "SUPABASE_DB_SCHEMA";

/// A place configuration values can be looked up by name.
pub trait ConfigSource {
    /// Look up a raw value.
    ///
    /// `Ok(None)` means the key is not set. Errors are for values that are
    /// set but unreadable.
    fn get(&self, key: &str) -> ProviderResult<Option<String>>;

    /// Look up a value that must be present.
    ///
    /// Absent, empty and whitespace-only values are all reported as
    /// [`ProviderError::MissingConfig`]. Present values come back trimmed.
    fn require(&self, key: &str) -> ProviderResult<String> {
        match self.get(key)? {
            Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => Err(ProviderError::missing(key)),
        }
    }

    /// Look up a value that may be absent. Blank values count as absent.
    fn optional(&self, key: &str) -> ProviderResult<Option<String>> {
        Ok(self
            .get(key)?
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()))
    }

    /// Chain a fallback source, consulted when this one has no usable value.
    fn or<B: ConfigSource>(self, fallback: B) -> Layered<Self, B>
    where
        Self: Sized,
    {
        Layered {
            primary: self,
            fallback,
        }
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn get(&self, key: &str) -> ProviderResult<Option<String>> {
        (**self).get(key)
    }
}

/// Reads from the process environment.
///
/// `.env` files are not read here; load them into the environment first
/// (the binary does this with `dotenvy`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> ProviderResult<Option<String>> {
        match std::env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(ProviderError::InvalidConfig {
                key: key.to_string(),
                cause: ConfigError::InvalidValue {
                    field: key.to_string(),
                    reason: "value is not valid unicode".to_string(),
                },
            }),
        }
    }
}

/// In-memory configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for MapConfig {
    fn get(&self, key: &str) -> ProviderResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }
}

/// Flat TOML file keyed by the same names as the environment.
///
/// ```toml
/// SUPABASE_URL = "https://project.supabase.co"
/// SUPABASE_ANON_KEY = "..."
/// SUPABASE_SERVICE_ROLE_KEY = "..."
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    values: MapConfig,
}

impl FileConfig {
    /// Load a configuration file.
    pub async fn load(path: &Path) -> ProviderResult<Self> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ProviderError::ConfigFile {
                    path: path.display().to_string(),
                    cause: ConfigError::Io(e.to_string()),
                })?;

        let config = Self::parse(&content).map_err(|cause| ProviderError::ConfigFile {
            path: path.display().to_string(),
            cause,
        })?;

        debug!(
            "Loaded {} configuration values from {}",
            config.values.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse file contents. Every top-level entry must be a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;

        let mut values = MapConfig::new();
        for (key, value) in table {
            match value {
                toml::Value::String(s) => values.insert(key, s),
                other => {
                    return Err(ConfigError::InvalidValue {
                        reason: format!("expected a string, found {}", other.type_str()),
                        field: key,
                    });
                }
            }
        }

        Ok(Self { values })
    }
}

impl ConfigSource for FileConfig {
    fn get(&self, key: &str) -> ProviderResult<Option<String>> {
        self.values.get(key)
    }
}

/// Two sources stacked: `primary` wins, `fallback` fills the gaps.
#[derive(Debug, Clone)]
pub struct Layered<A, B> {
    primary: A,
    fallback: B,
}

impl<A: ConfigSource, B: ConfigSource> ConfigSource for Layered<A, B> {
    fn get(&self, key: &str) -> ProviderResult<Option<String>> {
        match self.primary.get(key)? {
            Some(value) if !value.trim().is_empty() => Ok(Some(value)),
            _ => self.fallback.get(key),
        }
    }
}

/// The validated startup configuration.
///
/// Only constructed through [`SupabaseSettings::new`] or
/// [`SupabaseSettings::from_source`], so the URL is always normalized and
/// both keys are non-blank.
#[derive(Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    url: Url,
    anon_key: String,
    service_role_key: String,
    schema: Option<String>,
}

impl SupabaseSettings {
    /// Validate the three required values.
    pub fn new(url: &str, anon_key: &str, service_role_key: &str) -> ProviderResult<Self> {
        let url = non_blank(SUPABASE_URL, url)?;
        let anon_key = non_blank(SUPABASE_ANON_KEY, anon_key)?;
        let service_role_key = non_blank(SUPABASE_SERVICE_ROLE_KEY, service_role_key)?;

        Ok(Self {
            url: parse_endpoint(&url)?,
            anon_key,
            service_role_key,
            schema: None,
        })
    }

    /// Read and validate all values.
    ///
    /// Required values are read in the order URL, anon key, service-role
    /// key; the first missing one is reported.
    pub fn from_source(source: &impl ConfigSource) -> ProviderResult<Self> {
        let url = source.require(SUPABASE_URL)?;
        let anon_key = source.require(SUPABASE_ANON_KEY)?;
        let service_role_key = source.require(SUPABASE_SERVICE_ROLE_KEY)?;
        let schema = source.optional(SUPABASE_DB_SCHEMA)?;

        let settings = Self::new(&url, &anon_key, &service_role_key)?;
        Ok(match schema {
            Some(schema) => settings.with_schema(schema),
            None => settings,
        })
    }

    /// Use a non-default Postgres schema for REST requests. Blank means the
    /// project default.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        let schema = schema.into().trim().to_string();
        self.schema = (!schema.is_empty()).then_some(schema);
        self
    }

    /// Project endpoint, always ending in `/`.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    pub fn service_role_key(&self) -> &str {
        &self.service_role_key
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
}

fn non_blank(key: &str, value: &str) -> ProviderResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ProviderError::missing(key));
    }
    Ok(value.to_string())
}

impl std::fmt::Debug for SupabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseSettings")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[redacted]")
            .field("service_role_key", &"[redacted]")
            .field("schema", &self.schema)
            .finish()
    }
}

/// Parse the project URL and normalize its path to end in `/` so that
/// service paths (`rest/v1/`, `auth/v1/`, ...) join beneath it.
pub fn parse_endpoint(value: &str) -> ProviderResult<Url> {
    let mut url = Url::parse(value).map_err(|source| ProviderError::InvalidUrl {
        value: value.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ProviderError::UnsupportedScheme {
                value: value.to_string(),
                scheme: scheme.to_string(),
            });
        }
    }

    url.set_query(None);
    url.set_fragment(None);

    Ok(with_trailing_slash(url))
}

/// Make sure `url`'s path ends in `/`, so relative joins land beneath it
/// instead of replacing the last segment.
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
