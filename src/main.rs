use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use voldash::*;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let store = Arc::new(
        store::MetricsStore::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
            app_config.database.retention_days,
        )
        .await?,
    );
    store.init().await?;
    seed::seed_if_empty(&store, &app_config.seed, chrono::Utc::now()).await?;

    let (maintenance_tx, maintenance_rx) = tokio::sync::oneshot::channel();
    let maintenance_handle = maintenance::spawn(
        store.clone(),
        app_config.maintenance.clone(),
        maintenance_rx,
    );

    let sampler = if app_config.sampler.enabled {
        let (tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let handle = sampler::spawn(
            sampler::SamplerDeps {
                reader: Arc::new(host::HostReader::new()),
                store: store.clone(),
                shutdown_rx,
            },
            app_config.sampler.interval_secs,
        );
        Some((tx, handle))
    } else {
        None
    };

    let app = routes::app(store, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            if let Some((tx, handle)) = sampler {
                let _ = tx.send(());
                let _ = handle.await;
            }
            let _ = maintenance_tx.send(());
            let _ = maintenance_handle.await;
        }
    }

    Ok(())
}
