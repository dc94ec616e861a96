//! Background scheduled tasks for the application.
//!
//! Currently the only recurring job is the giveaway lifecycle scheduler, which
//! finalizes expired giveaways. Call `spawn_all` once during startup.

pub mod lifecycle;

pub use lifecycle::LifecycleScheduler;

use crate::config::SchedulerConfig;

/// Spawn all background tasks.
///
/// Notes
/// - The scheduler is idempotent with respect to start; a second call only warns.
/// - Tasks are detached via `tokio::spawn`; this function does not block.
pub fn spawn_all(lifecycle: &LifecycleScheduler, config: &SchedulerConfig) {
    if config.enabled {
        lifecycle.start();
    } else {
        log::warn!("Lifecycle scheduler disabled by configuration");
    }
}
