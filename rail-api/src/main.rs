use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use rail_api::{app, AppState, AuthConfig};
use rail_order::ReservationService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rail_api=debug,rail_order=info,rail_store=info,rail::invariant=error,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = rail_store::app_config::Config::load().context("Failed to load config")?;
    tracing::info!("Starting rail ledger API on port {}", config.server.port);

    let repo = rail_store::open_repository(&config)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to open ledger store")?;

    let events = rail_store::open_event_producer(&config)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to create event producer")?;

    let ledger = Arc::new(ReservationService::new(repo, Arc::new(events.clone())));

    let app_state = AppState {
        ledger,
        events,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            allow_named_login: config.auth.allow_named_login,
        },
    };

    if app_state.auth.allow_named_login {
        tracing::warn!("Named passenger login is enabled; any caller can act as any passenger");
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
