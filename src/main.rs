use std::{future::IntoFuture, net::SocketAddr, process, sync::Arc, time::Duration};

use jobscout::{
    application::{auth::StaticTokenVerifier, error::AppError, search::SearchService},
    cache::{CacheConfig, ResponseCache, spawn_sweeper},
    config,
    infra::{
        error::InfraError,
        http::{self, ApiRateLimiter, ApiState},
        provider::HttpJobProvider,
        telemetry,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let upstream_url = settings
        .upstream
        .url
        .clone()
        .ok_or_else(|| InfraError::configuration("upstream.url must be set to serve"))?;
    let provider = Arc::new(HttpJobProvider::new(upstream_url, settings.upstream.timeout)?);

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Arc::new(ResponseCache::new(&cache_config));
    let search = Arc::new(SearchService::new(
        Arc::clone(&cache),
        provider,
        cache_config.enabled,
    ));

    if settings.admin.token.is_none() {
        warn!(
            target = "jobscout::serve",
            "admin.token is not set; privileged cache routes will reject every caller"
        );
    }
    let verifier = Arc::new(StaticTokenVerifier::new(settings.admin.token.as_deref()));

    let rate_limiter = Arc::new(
        ApiRateLimiter::new(
            Duration::from_secs(settings.rate_limit.window_seconds.get().into()),
            settings.rate_limit.max_requests.get(),
        )
        .with_forwarded_for(settings.rate_limit.trust_forwarded_for),
    );

    let state = ApiState {
        cache: Arc::clone(&cache),
        cache_config: cache_config.clone(),
        search,
        verifier,
        rate_limiter,
    };

    let sweeper = spawn_sweeper(Arc::clone(&cache), cache_config.check_period());

    info!(
        target = "jobscout::serve",
        cache_enabled = cache_config.enabled,
        default_ttl_seconds = cache_config.default_ttl_seconds,
        check_period_seconds = cache_config.check_period().as_secs(),
        "response cache ready"
    );

    let result = serve_http(&settings, state).await;

    sweeper.abort();
    let _ = sweeper.await;

    result
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "jobscout::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut server_rx = shutdown_rx.clone();
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = server_rx.wait_for(|stop| *stop).await;
    })
    .into_future();

    let grace = settings.server.graceful_shutdown;
    let mut deadline_rx = shutdown_rx;
    let deadline = async move {
        let _ = deadline_rx.wait_for(|stop| *stop).await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        () = deadline => {
            warn!(
                target = "jobscout::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out, dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(target = "jobscout::serve", "shutdown signal received");
}
