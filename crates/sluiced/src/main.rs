//! sluiced — Sluice streaming relay daemon.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use sluice_core::config::SluiceConfig;
use sluice_services::{FileStore, TransferTable};

mod echo;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = SluiceConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = SluiceConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        SluiceConfig::default()
    });
    tracing::info!(
        api_port = config.network.api_port,
        read_buffer_bytes = config.relay.read_buffer_bytes,
        tcp_echo = config.services.tcp_echo,
        "sluiced starting"
    );

    let store = FileStore::new(&config.storage.path).with_context(|| {
        format!(
            "failed to create storage directory {}",
            config.storage.path.display()
        )
    })?;
    tracing::info!(path = %store.root().display(), "file storage ready");

    let transfers = TransferTable::new();

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let mut api_task = {
        let state = sluice_api::ApiState::new(
            transfers.clone(),
            store,
            config.relay.clone(),
            shutdown_tx.clone(),
        );
        let port = config.network.api_port;
        tokio::spawn(async move { sluice_api::serve(state, port).await })
    };

    let echo_task = if config.services.tcp_echo {
        let listener = echo::EchoListener::bind(
            config.network.echo_port,
            transfers.clone(),
            config.relay.read_buffer_bytes,
            shutdown_tx.clone(),
        )
        .await
        .context("failed to bind echo relay")?;
        Some(tokio::spawn(listener.run()))
    } else {
        None
    };
    let echo_exit = async move {
        match echo_task {
            Some(task) => task.await,
            None => std::future::pending().await,
        }
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    let api_exited = tokio::select! {
        _ = shutdown_rx.recv() => {
            tracing::info!("shutting down");
            false
        }
        r = &mut api_task => {
            tracing::error!("API server exited: {:?}", r);
            true
        }
        r = echo_exit => {
            tracing::error!("echo relay exited: {:?}", r);
            false
        }
    };

    // In-flight relays see the same signal; give the API a moment to drain.
    let _ = shutdown_tx.send(());
    if !api_exited
        && tokio::time::timeout(Duration::from_secs(5), api_task)
            .await
            .is_err()
    {
        tracing::warn!("API server did not stop within 5s");
    }

    let stats = transfers.stats();
    tracing::info!(
        completed = stats.completed,
        failed = stats.failed,
        bytes = stats.bytes,
        "sluiced stopped"
    );
    Ok(())
}
