//! Tracing setup shared by the server binary and integration tests

use std::path::Path;
use std::sync::Once;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with stdout and daily-rolling file output to `{data_dir}/logs`.
///
/// `RUST_LOG` takes precedence over `level`. Later calls are no-ops.
pub fn init_tracing(data_dir: &Path, level: &str) -> Result<(), Box<dyn std::error::Error>> {
	static INIT: Once = Once::new();
	let mut result: Result<(), Box<dyn std::error::Error>> = Ok(());

	INIT.call_once(|| {
		let logs_dir = data_dir.join("logs");
		if let Err(e) = std::fs::create_dir_all(&logs_dir) {
			result = Err(format!("Failed to create logs directory: {}", e).into());
			return;
		}

		let default_filter = format!("cs_core={level},cs_server={level},warn");
		let file_appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, "canvas-sync.log");

		if let Err(e) = tracing_subscriber::registry()
			.with(
				EnvFilter::try_from_default_env()
					.unwrap_or_else(|_| EnvFilter::new(default_filter)),
			)
			.with(
				fmt::layer()
					.with_target(true)
					.with_thread_ids(true)
					.with_writer(std::io::stdout),
			)
			.with(
				fmt::layer()
					.with_target(true)
					.with_thread_ids(true)
					.with_ansi(false) // No ANSI colors in log files
					.with_writer(file_appender),
			)
			.try_init()
		{
			result = Err(format!("Failed to initialize tracing: {}", e).into());
		}
	});

	result
}

/// Test-only subscriber writing to the captured test output
pub fn init_test_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cs_core=debug")),
		)
		.with_test_writer()
		.try_init();
}
