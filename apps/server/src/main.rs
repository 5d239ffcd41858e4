use std::{net::SocketAddr, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cs_core::{infra::logging::init_tracing, AppConfig, Core};
use cs_server::{router, utils, AppState};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "cs-server", about = "Canvas coordinate sync server")]
struct Args {
	/// Directory holding the config, database and logs
	#[arg(long, env = "DATA_DIR", default_value = "canvas_sync_data")]
	data_dir: PathBuf,

	/// Overrides `server.port` from the config
	#[arg(long, env = "PORT")]
	port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = AppConfig::load_from(&args.data_dir)?;
	init_tracing(&config.data_dir, &config.log_level).map_err(|e| anyhow!("{e}"))?;

	let core = Core::with_config(config)
		.await
		.context("Unable to initialize canvas sync core")?;

	let sync = core.canvas_sync().clone();
	let reaper = utils::spawn_reaper(sync.clone());

	let app = router(AppState::new(sync, &core.config.server.api_tokens));

	let port = args.port.unwrap_or(core.config.server.port);
	let addr = SocketAddr::from(([0, 0, 0, 0], port));
	let listener = tokio::net::TcpListener::bind(addr)
		.await
		.with_context(|| format!("Unable to bind {addr}"))?;

	info!("Listening on http://localhost:{}", port);
	axum::serve(listener, app)
		.with_graceful_shutdown(utils::axum_shutdown_signal())
		.await
		.context("Error with HTTP server")?;

	reaper.abort();
	Ok(())
}
