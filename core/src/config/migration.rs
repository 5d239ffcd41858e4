//! Versioned config upgrades

use anyhow::Result;

pub trait Migrate {
	fn current_version(&self) -> u32;

	fn target_version() -> u32;

	/// Bring the config up to `target_version`, one step at a time.
	fn migrate(&mut self) -> Result<()>;

	fn needs_migration(&self) -> bool {
		self.current_version() < Self::target_version()
	}
}
