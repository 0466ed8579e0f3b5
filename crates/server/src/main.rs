use std::{sync::Arc, time::Duration};

use server_api::{ApiContext, HttpAssistant};
use shared::domain::UserId;
use storage::Storage;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod routes;

use app_state::AppState;
use config::{load_settings, normalize_database_url};
use routes::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            error = %format!("{error:#}"),
            "failed to open database; verify the path and permissions"
        );
        error
    })?;
    storage.health_check().await?;
    info!(%database_url, "database ready");

    let mut api = ApiContext::new(storage, UserId::new(settings.default_user_id.clone()));
    match settings.assistant_url.as_deref() {
        Some(url) => {
            let assistant =
                HttpAssistant::new(url, Duration::from_secs(settings.assistant_timeout_secs))?;
            info!(endpoint = %assistant.endpoint(), "assistant forwarding enabled");
            api = api.with_assistant(Arc::new(assistant));
        }
        None => warn!("ASSISTANT_URL not set; chat messages will be stored without replies"),
    }

    let state = AppState {
        api,
        expose_error_detail: settings.environment.exposes_error_detail(),
    };
    let app = build_router(Arc::new(state));

    let listener = TcpListener::bind((settings.host.as_str(), settings.port)).await?;
    info!(
        addr = %listener.local_addr()?,
        environment = %settings.environment,
        "server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
