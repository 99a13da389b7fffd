//! Enrolment-key signup service

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use enrolkey_server::{
    routes, AppState, Config, ConsoleEmailSender, EmailSender, InMemoryStore, SmtpEmailSender,
    SqliteStore, Store,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "enrolkey_server=debug,enrolkey_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        port = config.port,
        db = ?config.db_path,
        require_confirmation = config.require_confirmation,
        require_key = config.require_key,
        public_url = %config.public_url,
        "Loaded configuration"
    );

    let email_sender: Box<dyn EmailSender> = match config.smtp.clone() {
        Some(smtp) => {
            Box::new(SmtpEmailSender::new(smtp).map_err(anyhow::Error::msg)?)
        }
        None => {
            tracing::warn!("SMTP not configured, confirmation links go to the console");
            Box::new(ConsoleEmailSender::new())
        }
    };

    match config.db_path.clone() {
        Some(path) => {
            let store = SqliteStore::open(&path)?;
            tracing::info!(path = %path, "Opened SQLite database");
            serve(store, email_sender, &config).await
        }
        None => {
            tracing::warn!("ENROLKEY_DB not set, using in-memory storage");
            serve(InMemoryStore::new(), email_sender, &config).await
        }
    }
}

async fn serve<S: Store>(store: S, email_sender: Box<dyn EmailSender>, config: &Config) -> Result<()> {
    let state = Arc::new(AppState::new(store, email_sender, config));
    let app = routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Signup service listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
