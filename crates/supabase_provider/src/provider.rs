//! Client provider
//!
//! Owns the public and admin clients for the life of the process. A provider
//! only exists once both clients are built, so there is no uninitialized
//! state to guard against.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::client::{AuthOptions, ClientOptions, ClientRole, KeyScope, SupabaseClient};
use crate::config::{ConfigSource, EnvConfig, SupabaseSettings};
use crate::error::ProviderResult;

/// The public and admin Supabase clients.
///
/// Cloning is cheap and clones share the same two handles, so the provider
/// can sit in shared application state.
#[derive(Debug, Clone)]
pub struct ClientProvider {
    client: Arc<SupabaseClient>,
    admin_client: Arc<SupabaseClient>,
}

impl ClientProvider {
    /// Read `SUPABASE_URL`, `SUPABASE_ANON_KEY` and
    /// `SUPABASE_SERVICE_ROLE_KEY` from `source` and build both clients.
    ///
    /// All three values are read before anything is built; a missing one
    /// fails with [`crate::ProviderError::MissingConfig`].
    pub fn init(source: &impl ConfigSource) -> ProviderResult<Self> {
        let settings = SupabaseSettings::from_source(source)?;
        Self::from_settings(&settings)
    }

    /// [`ClientProvider::init`] against the process environment.
    pub fn from_env() -> ProviderResult<Self> {
        Self::init(&EnvConfig)
    }

    /// Build both clients from already validated settings.
    pub fn from_settings(settings: &SupabaseSettings) -> ProviderResult<Self> {
        check_key_placement(settings);

        let mut options = ClientOptions::default();
        if let Some(schema) = settings.schema() {
            options = options.with_schema(schema);
        }

        let client = SupabaseClient::new(
            settings.url(),
            settings.anon_key(),
            ClientRole::Public,
            options.clone(),
        )?;

        let admin_client = SupabaseClient::new(
            settings.url(),
            settings.service_role_key(),
            ClientRole::Admin,
            options.with_auth(AuthOptions::stateless()),
        )?;

        info!(endpoint = %settings.url(), "Supabase clients initialized");

        Ok(Self {
            client: Arc::new(client),
            admin_client: Arc::new(admin_client),
        })
    }

    /// Public client. Respects row-level security using the anon key.
    pub fn client(&self) -> &SupabaseClient {
        &self.client
    }

    /// Admin client. Bypasses row-level security using the service-role key.
    pub fn admin_client(&self) -> &SupabaseClient {
        &self.admin_client
    }

    /// Endpoint shared by both clients.
    pub fn endpoint(&self) -> &Url {
        self.client.url()
    }
}

fn check_key_placement(settings: &SupabaseSettings) {
    if KeyScope::of(settings.anon_key()) == KeyScope::Privileged {
        warn!(
            "SUPABASE_ANON_KEY holds a privileged key; the public client will bypass row-level security"
        );
    }
    if KeyScope::of(settings.service_role_key()) == KeyScope::Public {
        warn!("SUPABASE_SERVICE_ROLE_KEY holds a public key; the admin client will be subject to row-level security");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        MapConfig, SUPABASE_ANON_KEY, SUPABASE_DB_SCHEMA, SUPABASE_SERVICE_ROLE_KEY, SUPABASE_URL,
    };
    use crate::error::ProviderError;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn example_config() -> MapConfig {
        MapConfig::new()
            .with(SUPABASE_URL, "https://x.example")
            .with(SUPABASE_ANON_KEY, "pub_123")
            .with(SUPABASE_SERVICE_ROLE_KEY, "svc_456")
    }

    #[test]
    fn test_init_builds_both_clients() {
        let provider = ClientProvider::init(&example_config()).unwrap();

        let client = provider.client();
        let admin = provider.admin_client();

        assert_eq!(client.key(), "pub_123");
        assert_eq!(client.role(), ClientRole::Public);
        assert_eq!(admin.key(), "svc_456");
        assert_eq!(admin.role(), ClientRole::Admin);
        assert!(!std::ptr::eq(client, admin));

        assert_eq!(client.url(), admin.url());
        assert_eq!(provider.endpoint().as_str(), "https://x.example/");
    }

    #[test]
    fn test_auth_policy_per_client() {
        let provider = ClientProvider::init(&example_config()).unwrap();

        let admin_auth = provider.admin_client().options().auth;
        assert!(!admin_auth.auto_refresh_token);
        assert!(!admin_auth.persist_session);

        let public_auth = provider.client().options().auth;
        assert!(public_auth.auto_refresh_token);
        assert!(public_auth.persist_session);
    }

    #[test]
    fn test_accessors_return_same_instance() {
        let provider = ClientProvider::init(&example_config()).unwrap();

        assert!(std::ptr::eq(provider.client(), provider.client()));
        assert!(std::ptr::eq(provider.admin_client(), provider.admin_client()));

        let shared = provider.clone();
        assert!(std::ptr::eq(provider.client(), shared.client()));
        assert!(std::ptr::eq(provider.admin_client(), shared.admin_client()));
    }

    #[test]
    fn test_missing_service_key_fails() {
        let config = MapConfig::new()
            .with(SUPABASE_URL, "https://x.example")
            .with(SUPABASE_ANON_KEY, "pub_123");

        let err = ClientProvider::init(&config).unwrap_err();
        assert!(
            matches!(&err, ProviderError::MissingConfig { key } if key == SUPABASE_SERVICE_ROLE_KEY),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let config = example_config().with(SUPABASE_ANON_KEY, "");
        let err = ClientProvider::init(&config).unwrap_err();
        assert!(matches!(err, ProviderError::MissingConfig { key } if key == SUPABASE_ANON_KEY));
    }

    #[test]
    fn test_invalid_url_fails() {
        let config = example_config().with(SUPABASE_URL, "x.example");
        assert!(matches!(
            ClientProvider::init(&config),
            Err(ProviderError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_from_settings_validated() {
        let err = SupabaseSettings::new("https://x.example/base", "", "   ").unwrap_err();
        assert!(matches!(err, ProviderError::MissingConfig { key } if key == SUPABASE_ANON_KEY));

        let settings = SupabaseSettings::new("https://x.example/base", "pub_123", "svc_456").unwrap();
        let provider = ClientProvider::from_settings(&settings).unwrap();

        assert_eq!(provider.endpoint().as_str(), "https://x.example/base/");
        assert_eq!(
            provider.client().rest_url().as_str(),
            "https://x.example/base/rest/v1/"
        );
        assert_eq!(
            provider.admin_client().rest_url().as_str(),
            "https://x.example/base/rest/v1/"
        );
    }

    #[test]
    fn test_schema_applies_to_both_clients() {
        let config = example_config().with(SUPABASE_DB_SCHEMA, "analytics");
        let provider = ClientProvider::init(&config).unwrap();

        for client in [provider.client(), provider.admin_client()] {
            assert_eq!(client.options().schema.as_deref(), Some("analytics"));
            assert_eq!(
                client.default_headers().get("accept-profile").unwrap(),
                "analytics"
            );
        }
        assert!(!provider.admin_client().options().auth.persist_session);
        assert!(provider.client().options().auth.persist_session);
    }

    #[traced_test]
    #[test]
    fn test_init_logs_success() {
        ClientProvider::init(&example_config()).unwrap();
        assert!(logs_contain("Supabase clients initialized"));
        assert!(!logs_contain("privileged key"));
    }

    #[traced_test]
    #[test]
    fn test_swapped_keys_warn() {
        let config = example_config()
            .with(SUPABASE_ANON_KEY, "sb_secret_abc")
            .with(SUPABASE_SERVICE_ROLE_KEY, "sb_publishable_abc");

        let provider = ClientProvider::init(&config).unwrap();
        assert_eq!(provider.client().key(), "sb_secret_abc");
        assert!(logs_contain("SUPABASE_ANON_KEY holds a privileged key"));
        assert!(logs_contain("SUPABASE_SERVICE_ROLE_KEY holds a public key"));
    }
}
