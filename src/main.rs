//! The backend for the Step Up Bhubaneswar workshop registration site.

use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stepup::db::Db;
use stepup::routes::{router, AppState};
use stepup::workshop::WorkshopDirectory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stepup=info,tower_http=warn")),
        )
        .init();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:stepup.db".to_string());
    let db = Db::connect(&database_url)
        .await
        .with_context(|| format!("couldn't open database at {}", database_url))?;

    let workshops = match env::var("WORKSHOPS_FILE") {
        Ok(path) => WorkshopDirectory::load(Path::new(&path))?,
        Err(_) => {
            let directory = WorkshopDirectory::builtin();
            directory.validate()?;
            directory
        }
    };
    info!(
        workshops = workshops.workshops.len(),
        default = %workshops.default_workshop,
        "workshop directory loaded"
    );

    let state = AppState {
        db: Arc::new(db),
        workshops: Arc::new(workshops),
        default_payment_method: env::var("DEFAULT_PAYMENT_METHOD")
            .unwrap_or_else(|_| "UPI".to_string()),
    };

    let port = env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
