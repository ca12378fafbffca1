//! NIDS agent entrypoint: loads the model, starts the observer server on the async runtime,
//! and runs the capture loop on a dedicated thread until Ctrl+C or the source ends.

use nids_agent::{
    capture::open_source,
    config::NidsConfig,
    features::Vectorizer,
    hub::BroadcastHub,
    model::ModelArtifacts,
    pipeline::CaptureLoop,
    server::ObserverServer,
    storage::EventLog,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("NIDS_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = NidsConfig::load_for_startup(&config_path)?;
    info!(config = %config_path.display(), "NIDS agent starting");

    // Nothing is captured unless every artifact loads.
    let artifacts = ModelArtifacts::load(&config.model).map_err(|e| {
        error!(error = %e, "failed to load model artifacts");
        e
    })?;
    let mut source = open_source(&config.capture).map_err(|e| {
        error!(error = %e, "failed to open capture source");
        e
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("nids-observers")
        .build()?;

    let (hub, handle) = BroadcastHub::new(&config.hub);
    runtime.spawn(hub.run());
    let server = runtime.block_on(ObserverServer::bind(&config.server, handle.clone()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        let shutdown_tx = Arc::clone(&shutdown_tx);
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
            let _ = shutdown_tx.send(true);
        })?;
    }
    let server_task = runtime.spawn(server.run(shutdown_rx.clone()));

    let mut capture_loop = CaptureLoop::new(
        Vectorizer::new(artifacts.feature_order),
        artifacts.scorer,
        EventLog::open(&config.event_log.path),
        handle,
    );
    let capture_stop = Arc::clone(&stop);
    let capture = std::thread::Builder::new()
        .name("nids-capture".to_string())
        .spawn(move || capture_loop.run(source.as_mut(), &capture_stop))?;

    let capture_result = capture
        .join()
        .map_err(|_| "capture thread panicked")?;

    let mut outcome = Ok(());
    match capture_result {
        Ok(()) => {}
        Err(e) if config.capture.exit_on_error => outcome = Err(e),
        Err(_) => {
            info!("capture stopped; observer server keeps running (Ctrl+C to stop)");
            let mut rx = shutdown_rx;
            runtime.block_on(async {
                while !*rx.borrow() {
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            });
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = runtime.block_on(server_task);
    runtime.shutdown_timeout(Duration::from_secs(2));
    info!("NIDS agent stopping");

    outcome.map_err(Into::into)
}
