use cs_core::CanvasSync;
use tokio::{
	signal,
	task::JoinHandle,
	time::{interval, MissedTickBehavior},
};
use tracing::{info, warn};

pub async fn axum_shutdown_signal() {
	match signal::ctrl_c().await {
		Ok(()) => info!("Shutting down canvas sync server"),
		Err(e) => warn!(error = %e, "Failed to listen for ctrl-c, shutting down"),
	}
}

/// Periodically fail runs whose owner stopped heartbeating
pub fn spawn_reaper(sync: CanvasSync) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = interval(sync.config().reap_interval());
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			ticker.tick().await;
			match sync.reap_stale().await {
				Ok(0) => {}
				Ok(reaped) => info!(reaped, "Reaped stale canvas sync runs"),
				Err(e) => warn!(error = %e, "Stale canvas sync sweep failed"),
			}
		}
	})
}
