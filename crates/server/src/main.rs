use std::future::IntoFuture;

use anyhow::{self, Error as AnyhowError};
use server::{Deployment, deployment::DeploymentError, http};
use services::services::config::{Config, load_config_from_file, save_config_to_file};
use thiserror::Error;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, prelude::*};
use utils::assets::config_path;

const GRACEFUL_SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TaskGateError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), TaskGateError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level},tasks={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string)
        .map_err(|e| anyhow::anyhow!("failed to create tracing filter: {e}"))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config_path = config_path()?;
    let config = apply_env_overrides(load_config_from_file(&config_path).await);
    if let Err(e) = save_config_to_file(&config, &config_path).await {
        tracing::warn!("Failed to save config to {}: {}", config_path.display(), e);
    }

    let host = config.host.clone();
    let port = config.port;
    let deployment = Deployment::new(config).await?;
    let app_router = http::router(deployment);

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let actual_port = listener.local_addr()?.port();
    tracing::info!("Server running on http://{host}:{actual_port}");

    let shutdown_rx = spawn_shutdown_watcher();
    let server = axum::serve(listener, app_router)
        .with_graceful_shutdown(wait_for_watch_true(shutdown_rx.clone()))
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => res?,
        _ = shutdown_deadline(shutdown_rx, GRACEFUL_SHUTDOWN_TIMEOUT) => {
            tracing::warn!(
                "Graceful shutdown timed out after {:?}, exiting immediately",
                GRACEFUL_SHUTDOWN_TIMEOUT
            );
            std::process::exit(130);
        }
    }

    Ok(())
}

/// `HOST`, `BACKEND_PORT` (or `PORT`) and `DATABASE_URL` take precedence over
/// the config file. They are not written back.
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(host) = std::env::var("HOST")
        && !host.trim().is_empty()
    {
        config.host = host.trim().to_string();
    }

    if let Ok(raw) = std::env::var("BACKEND_PORT").or_else(|_| std::env::var("PORT")) {
        match raw.trim().parse::<u16>() {
            Ok(port) => config.port = port,
            Err(e) => tracing::warn!(value = raw.trim(), error = %e, "Ignoring invalid port"),
        }
    }

    if let Ok(url) = std::env::var("DATABASE_URL")
        && !url.trim().is_empty()
    {
        config.database_url = Some(url.trim().to_string());
    }

    config
}

fn spawn_shutdown_watcher() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sig) => Some(sig),
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {e}");
                    None
                }
            };

            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        tracing::error!("Failed to install Ctrl+C handler: {e}");
                        return;
                    }
                }
                _ = async {
                    match sigterm.as_mut() {
                        Some(sigterm) => { sigterm.recv().await; }
                        None => std::future::pending::<()>().await,
                    }
                } => {}
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
                return;
            }
        }

        tracing::info!("Shutdown signal received, starting graceful shutdown");
        let _ = shutdown_tx.send(true);
    });

    shutdown_rx
}

async fn wait_for_watch_true(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }

        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn shutdown_deadline(rx: watch::Receiver<bool>, timeout: std::time::Duration) {
    wait_for_watch_true(rx).await;
    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn watch_resolves_once_flag_flips() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_watch_true(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
