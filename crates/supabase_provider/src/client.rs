//! Supabase client handle
//!
//! A [`SupabaseClient`] pairs a project endpoint with one key. Every request
//! sent through [`SupabaseClient::http`] carries that key in the `apikey` and
//! `Authorization` headers, so the key decides which row-level-security
//! policies apply.

use std::time::Duration;

use base64::Engine;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::config::with_trailing_slash;
use crate::error::{ProviderError, ProviderResult};

const API_KEY_HEADER: HeaderName = HeaderName::from_static("apikey");
const ACCEPT_PROFILE_HEADER: HeaderName = HeaderName::from_static("accept-profile");
const CONTENT_PROFILE_HEADER: HeaderName = HeaderName::from_static("content-profile");

/// Which privileges a handle was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientRole {
    /// Anon key, subject to row-level security.
    Public,
    /// Service-role key, bypasses row-level security.
    Admin,
}

impl std::fmt::Display for ClientRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientRole::Public => f.pad("public"),
            ClientRole::Admin => f.pad("admin"),
        }
    }
}

/// Session handling policy for a handle.
///
/// These flags are consulted by session-aware callers; the handle itself
/// never signs users in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOptions {
    /// Refresh user access tokens before they expire.
    pub auto_refresh_token: bool,
    /// Keep the user session between requests.
    pub persist_session: bool,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
        }
    }
}

impl AuthOptions {
    /// No refresh, no persistence. Used for keys not tied to an end-user session.
    pub fn stateless() -> Self {
        Self {
            auto_refresh_token: false,
            persist_session: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    pub auth: AuthOptions,
    /// Postgres schema for REST requests. `None` means the project default.
    pub schema: Option<String>,
}

impl ClientOptions {
    pub fn with_auth(mut self, auth: AuthOptions) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Best-effort classification of a Supabase key.
///
/// Legacy keys are JWTs whose `role` claim is `anon` or `service_role`; newer
/// keys carry an `sb_publishable_` or `sb_secret_` prefix. Anything else is
/// [`KeyScope::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    Public,
    Privileged,
    Unknown,
}

#[derive(Deserialize)]
struct KeyClaims {
    role: Option<String>,
}

impl KeyScope {
    pub fn of(key: &str) -> Self {
        if key.starts_with("sb_publishable_") {
            return KeyScope::Public;
        }
        if key.starts_with("sb_secret_") {
            return KeyScope::Privileged;
        }

        match jwt_role(key).as_deref() {
            Some("anon") => KeyScope::Public,
            Some("service_role") => KeyScope::Privileged,
            _ => KeyScope::Unknown,
        }
    }
}

/// Read the `role` claim of a JWT without verifying it.
fn jwt_role(key: &str) -> Option<String> {
    let mut parts = key.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice::<KeyClaims>(&bytes).ok()?.role
}

fn provider_reqwest_client(headers: HeaderMap) -> ProviderResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("supabase-provider/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(5))
        .build()?)
}

/// Handle to one Supabase project, authorized with one key.
#[derive(Clone)]
pub struct SupabaseClient {
    url: Url,
    key: String,
    role: ClientRole,
    options: ClientOptions,
    headers: HeaderMap,
    http: reqwest::Client,
    rest_url: Url,
    auth_url: Url,
    storage_url: Url,
    functions_url: Url,
    realtime_url: Url,
}

impl SupabaseClient {
    /// Build a handle. A `url` path without a trailing `/` gets one, so
    /// service paths join beneath it.
    pub fn new(
        url: &Url,
        key: &str,
        role: ClientRole,
        options: ClientOptions,
    ) -> ProviderResult<Self> {
        let url = with_trailing_slash(url.clone());
        let headers = default_headers(key, role, &options)?;
        let http = provider_reqwest_client(headers.clone())?;

        Ok(Self {
            rest_url: service_url(&url, "rest/v1/")?,
            auth_url: service_url(&url, "auth/v1/")?,
            storage_url: service_url(&url, "storage/v1/")?,
            functions_url: service_url(&url, "functions/v1/")?,
            realtime_url: service_url(&url, "realtime/v1/")?,
            url,
            key: key.to_string(),
            role,
            options,
            headers,
            http,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn role(&self) -> ClientRole {
        self.role
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// HTTP client with the key headers applied to every request.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Headers attached to every request.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// PostgREST root, `<url>/rest/v1/`.
    pub fn rest_url(&self) -> &Url {
        &self.rest_url
    }

    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    pub fn storage_url(&self) -> &Url {
        &self.storage_url
    }

    pub fn functions_url(&self) -> &Url {
        &self.functions_url
    }

    pub fn realtime_url(&self) -> &Url {
        &self.realtime_url
    }

    /// Hit the auth service health endpoint and return the status code.
    pub async fn health(&self) -> ProviderResult<reqwest::StatusCode> {
        let url = self
            .auth_url
            .join("health")
            .map_err(|source| ProviderError::InvalidUrl {
                value: self.auth_url.to_string(),
                source,
            })?;

        let response = self.http.get(url).send().await?;
        Ok(response.status())
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("url", &self.url.as_str())
            .field("role", &self.role)
            .field("key", &"[redacted]")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn service_url(base: &Url, path: &str) -> ProviderResult<Url> {
    base.join(path).map_err(|source| ProviderError::InvalidUrl {
        value: base.to_string(),
        source,
    })
}

fn default_headers(
    key: &str,
    role: ClientRole,
    options: &ClientOptions,
) -> ProviderResult<HeaderMap> {
    let invalid = |reason: String| ProviderError::InvalidKey {
        key: format!("{role} client"),
        reason,
    };

    let mut api_key = HeaderValue::from_str(key).map_err(|e| invalid(e.to_string()))?;
    api_key.set_sensitive(true);
    let mut bearer =
        HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| invalid(e.to_string()))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(API_KEY_HEADER, api_key);
    headers.insert(AUTHORIZATION, bearer);

    if let Some(schema) = &options.schema {
        let value = HeaderValue::from_str(schema).map_err(|e| ProviderError::InvalidSchema {
            schema: schema.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(ACCEPT_PROFILE_HEADER, value.clone());
        headers.insert(CONTENT_PROFILE_HEADER, value);
    }

    Ok(headers)
}
