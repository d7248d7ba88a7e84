//! Configuration management for the WebP converter.
//!
//! Settings come from command-line arguments, environment variables or a
//! `.env` file (loaded by the binary before parsing), with defaults for
//! everything.
//!
//! # Environment Variables
//!
//! - `CONVERTER_HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 3000)
//! - `CONVERTER_UPLOAD_DIR` - Directory for uploaded originals (default: uploads)
//! - `CONVERTER_OUTPUT_DIR` - Directory for encoded output (default: output)
//! - `CONVERTER_MAX_UPLOAD_SIZE` - Upload cap in bytes (default: 10 MiB)
//! - `ALLOWED_ORIGINS` - Comma-separated CORS origins (default: any)
//! - `CONVERTER_RATE_LIMIT_MAX` - Requests per window per IP (default: 100)
//! - `CONVERTER_RATE_LIMIT_WINDOW` - Window length in seconds (default: 900)
//! - `CONVERTER_REQUEST_TIMEOUT` - Upload + conversion deadline in seconds (default: 120)
//! - `CONVERTER_MAX_CONCURRENT` - Simultaneous conversions (default: CPU count)

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::server::rate_limit::{DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_WINDOW};
use crate::server::{RouterConfig, DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_REQUEST_TIMEOUT};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default directory for uploaded originals.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default directory for encoded output.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default rate limit window in seconds (15 minutes).
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = DEFAULT_RATE_LIMIT_WINDOW.as_secs();

/// Default upload + conversion deadline in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = DEFAULT_REQUEST_TIMEOUT.as_secs();

// =============================================================================
// CLI Arguments
// =============================================================================

/// WebP Converter - convert uploaded images to WebP over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "webp-converter")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "CONVERTER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory where uploads are written while being converted.
    #[arg(long, default_value = DEFAULT_UPLOAD_DIR, env = "CONVERTER_UPLOAD_DIR")]
    pub upload_dir: PathBuf,

    /// Directory where encoded output is written until it has been sent.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "CONVERTER_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Maximum size of an uploaded image in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_SIZE, env = "CONVERTER_MAX_UPLOAD_SIZE")]
    pub max_upload_size: usize,

    // =========================================================================
    // Limits
    // =========================================================================
    /// Requests allowed per client IP per rate limit window.
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_MAX, env = "CONVERTER_RATE_LIMIT_MAX")]
    pub rate_limit_max: u32,

    /// Rate limit window in seconds.
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_WINDOW_SECS, env = "CONVERTER_RATE_LIMIT_WINDOW")]
    pub rate_limit_window: u64,

    /// Deadline in seconds for receiving and converting an upload.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "CONVERTER_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// Maximum number of conversions running at once.
    ///
    /// Defaults to the number of available CPUs.
    #[arg(long, env = "CONVERTER_MAX_CONCURRENT")]
    pub max_concurrent_conversions: Option<usize>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty. Set --host or CONVERTER_HOST".to_string());
        }

        if self.max_upload_size == 0 {
            return Err("max_upload_size must be greater than 0".to_string());
        }

        if self.rate_limit_max == 0 {
            return Err("rate_limit_max must be greater than 0".to_string());
        }
        if self.rate_limit_window == 0 {
            return Err("rate_limit_window must be greater than 0".to_string());
        }

        if self.request_timeout == 0 {
            return Err("request_timeout must be greater than 0".to_string());
        }

        if self.max_concurrent_conversions == Some(0) {
            return Err("max_concurrent_conversions must be greater than 0".to_string());
        }

        if self.upload_dir == self.output_dir {
            return Err("upload_dir and output_dir must be different directories".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Number of simultaneous conversions, falling back to the CPU count.
    pub fn conversion_permits(&self) -> usize {
        self.max_concurrent_conversions.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Router settings derived from this configuration.
    pub fn router_config(&self) -> RouterConfig {
        let mut router_config = RouterConfig::new()
            .with_max_upload_size(self.max_upload_size)
            .with_rate_limit(self.rate_limit_max, self.rate_limit_window())
            .with_request_timeout(self.request_timeout())
            .with_tracing(!self.no_tracing);

        if let Some(ref origins) = self.cors_origins {
            router_config = router_config.with_cors_origins(origins.clone());
        }

        router_config
    }
}

// =============================================================================
// Tests
// =============================================================================
