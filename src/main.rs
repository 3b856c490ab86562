use rtc_negotiator::application::{ConnectionLifecycle, LifecycleSettings};
use rtc_negotiator::config::Config;
use rtc_negotiator::domain::connection::ConnectionState;
use rtc_negotiator::infrastructure::protocols::webrtc::{
    LoggingDisplaySink, StaticMediaSource, WebRtcConnectionFactory,
};
use rtc_negotiator::infrastructure::signaling::HttpSignalingClient;
use rtc_negotiator::interface::api::{build_router, init_metrics, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting rtc-negotiator");
    info!("Signaling endpoint: {}", config.signaling.offer_url());

    let prometheus_handle = init_metrics()?;

    let signaling = HttpSignalingClient::from_config(&config.signaling)?;
    let settings = LifecycleSettings::from(&config);
    let teardown_grace = settings.teardown_grace;

    let lifecycle = Arc::new(ConnectionLifecycle::new(
        Arc::new(WebRtcConnectionFactory::new()),
        Arc::new(StaticMediaSource::new()),
        Arc::new(signaling),
        Arc::new(LoggingDisplaySink::new("local-preview")),
        Arc::new(LoggingDisplaySink::new("remote-playback")),
        settings,
    ));

    let app = build_router(
        AppState {
            lifecycle: lifecycle.clone(),
        },
        prometheus_handle,
    );

    let listener = tokio::net::TcpListener::bind(config.listen_address()).await?;
    info!("Control API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutting down...");
        })
        .await?;

    // Stop the session, if any, and let teardown finish
    if let Err(e) = lifecycle.stop().await {
        warn!("Failed to stop session: {}", e);
    }
    if !lifecycle
        .wait_for_state(ConnectionState::Idle, teardown_grace + Duration::from_secs(1))
        .await
    {
        warn!("Session teardown did not finish before exit");
    }

    info!("rtc-negotiator stopped");
    Ok(())
}
