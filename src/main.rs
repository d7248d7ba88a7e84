//! WebP Converter - an HTTP service that converts uploaded images to WebP.
//!
//! This binary loads configuration, prepares the scratch directories and
//! serves the API until interrupted.

use clap::Parser;
use std::net::SocketAddr;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webp_converter::{create_router, Config, ConversionService, ScratchSpace};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; real environment variables still apply
    dotenvy::dotenv().ok();

    let config = Config::parse();
    run(config).await
}

async fn run(config: Config) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    let permits = config.conversion_permits();

    info!("Configuration:");
    info!("  Upload dir: {}", config.upload_dir.display());
    info!("  Output dir: {}", config.output_dir.display());
    info!(
        "  Max upload: {}MB",
        config.max_upload_size / (1024 * 1024)
    );
    info!(
        "  Rate limit: {} requests / {}s per IP",
        config.rate_limit_max, config.rate_limit_window
    );
    info!("  Request timeout: {}s", config.request_timeout);
    info!("  Concurrent conversions: {}", permits);
    match config.cors_origins {
        Some(ref origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }

    let scratch = ScratchSpace::new(&config.upload_dir, &config.output_dir);
    if let Err(e) = scratch.ensure_dirs() {
        error!("Failed to create scratch directories: {}", e);
        return ExitCode::FAILURE;
    }

    let service = ConversionService::new(scratch, permits);
    let router = create_router(service, config.router_config());

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Convert an image:");
    info!(
        "    curl -F image=@photo.jpg -F filename=photo -F quality=80 \\"
    );
    info!("         -o photo.webp http://{}/api/convert", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let served = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("WebP Converter v{}", version);
    info!("");
}

/// Initialize the tracing subscriber for logging.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "webp_converter=debug,tower_http=debug"
    } else {
        "webp_converter=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received, finishing in-flight requests");
}
