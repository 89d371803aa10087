//! Supabase client provider
//!
//! Builds the two Supabase clients a backend needs at startup:
//! - a public client, authorized with the anon key and subject to
//!   row-level security
//! - an admin client, authorized with the service-role key, which bypasses
//!   row-level security and never refreshes or persists user sessions
//!
//! ```no_run
//! use supabase_provider::ClientProvider;
//!
//! let provider = ClientProvider::from_env()?;
//! let rows_url = provider.client().rest_url().join("todos")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod provider;

pub use client::{AuthOptions, ClientOptions, ClientRole, KeyScope, SupabaseClient};
pub use config::{
    ConfigSource, EnvConfig, FileConfig, Layered, MapConfig, SUPABASE_ANON_KEY, SUPABASE_DB_SCHEMA,
    SUPABASE_SERVICE_ROLE_KEY, SUPABASE_URL, SupabaseSettings,
};
pub use error::{ConfigError, ProviderError, ProviderResult};
pub use provider::ClientProvider;
