use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use supabase_provider::{ClientProvider, ConfigSource, EnvConfig, FileConfig, SupabaseClient};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "supabase-provider")]
#[command(about = "Initialize the public and admin Supabase clients from configuration")]
#[command(version)]
struct Cli {
    /// TOML file with SUPABASE_* values (environment variables override it)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Load this .env file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Query the auth health endpoint with both clients
    #[arg(long)]
    check: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path).into_diagnostic()?;
        }
        // Load .env file if it exists
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();

    init_tracing(cli.debug);

    let provider = match &cli.config {
        Some(path) => {
            info!("Loading config from: {:?}", path);
            let file = FileConfig::load(path).await?;
            ClientProvider::init(&EnvConfig.or(file))?
        }
        None => ClientProvider::from_env()?,
    };

    print_summary(&provider);

    if cli.check {
        let mut healthy = true;
        for client in [provider.client(), provider.admin_client()] {
            healthy &= check(client).await?;
        }
        if !healthy {
            miette::bail!("Supabase health check failed");
        }
    }

    Ok(())
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{
        EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    // Logs go to stderr so the summary on stdout stays clean
    let layer = if debug {
        fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .pretty()
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .compact()
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(env_filter))
        .init();
}

/// Default log filter. The binary shares the library's tracing target,
/// `supabase_provider`, so one directive covers both.
fn default_filter(debug: bool) -> &'static str {
    if debug {
        "supabase_provider=debug,info"
    } else {
        "supabase_provider=info,warn"
    }
}

fn print_summary(provider: &ClientProvider) {
    println!("{} {}", "Endpoint:".bright_cyan(), provider.endpoint());
    for client in [provider.client(), provider.admin_client()] {
        let auth = client.options().auth;
        println!(
            "  {} {} auto_refresh_token={} persist_session={}",
            format!("{:<6}", client.role()).bold(),
            client.rest_url(),
            auth.auto_refresh_token,
            auth.persist_session,
        );
    }
}

async fn check(client: &SupabaseClient) -> Result<bool> {
    let status = client.health().await?;
    if status.is_success() {
        println!("  {} {} {}", "ok".green(), client.role(), status);
        Ok(true)
    } else {
        warn!("{} client health check returned {}", client.role(), status);
        println!("  {} {} {}", "failed".red(), client.role(), status);
        Ok(false)
    }
}
