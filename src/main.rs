use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use taallum::{
    bootstrap,
    config::Config,
    db::{self, AppState, DbPool},
    handlers,
};

#[derive(Parser)]
#[command(name = "taallum", version, about = "Taallum promo-code service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create an admin user (or reuse an existing one) and print a new API key
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taallum=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let pool = db::create_pool(&config.database_path, 8)
        .with_context(|| format!("opening database {}", config.database_path))?;
    {
        let conn = pool.get()?;
        db::init_db(&conn)?;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::CreateAdmin { email, name } => {
            let conn = pool.get()?;
            let (user, api_key) = bootstrap::create_admin(&conn, &email, &name)?;
            println!("Admin: {} ({})", user.email, user.id);
            println!("API key (shown once): {}", api_key);
            Ok(())
        }
    }
}

async fn serve(config: Config, pool: DbPool) -> anyhow::Result<()> {
    if let Some(email) = &config.bootstrap_admin_email {
        let conn = pool.get()?;
        if let Some(api_key) = bootstrap::bootstrap_admin(&conn, email)? {
            tracing::warn!("Admin API key for {} (shown once): {}", email, api_key);
        }
    }

    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; /webhook/stripe will reject events");
    }

    let state = AppState {
        db: pool,
        stripe_webhook_secret: config.stripe_webhook_secret.clone(),
    };
    let app = handlers::app(state, &config);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
