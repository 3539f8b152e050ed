//! Collaboration tuning knobs.
//!
//! Defaults match the values the editor clients were built against; each can
//! be overridden through the environment for deployment tuning.

use std::time::Duration;

/// Default lifetime of a component lock.
const DEFAULT_LOCK_DURATION_MS: u64 = 30_000;
/// Default inactivity window before a session is considered abandoned.
const DEFAULT_INACTIVE_THRESHOLD_MS: u64 = 60_000;
/// Default interval between sweeper passes.
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 5_000;
/// Default maximum concurrent sessions per project.
const DEFAULT_MAX_USERS_PER_PROJECT: usize = 10;

/// Avatar colors handed out to joining sessions.
///
/// Assignment is best-effort unique within a project; once all ten are in
/// use the server falls back to a random pick, so two users can share a
/// color under high occupancy.
pub const USER_COLORS: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
    "#BB8FCE", "#85C1E9",
];

/// Runtime configuration for the collaboration store and sweeper.
#[derive(Debug, Clone)]
pub struct CollabConfig {
    /// How long a component lock stays valid after (re-)acquisition.
    pub lock_duration: Duration,
    /// How long a session may stay silent before the sweeper evicts it.
    pub inactive_threshold: Duration,
    /// How often the sweeper runs.
    pub sweep_interval: Duration,
    /// Maximum concurrent sessions attached to one project.
    pub max_users_per_project: usize,
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            lock_duration: Duration::from_millis(DEFAULT_LOCK_DURATION_MS),
            inactive_threshold: Duration::from_millis(DEFAULT_INACTIVE_THRESHOLD_MS),
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
            max_users_per_project: DEFAULT_MAX_USERS_PER_PROJECT,
        }
    }
}

impl CollabConfig {
    /// Build a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `COLLAB_LOCK_DURATION_MS`
    /// - `COLLAB_INACTIVE_THRESHOLD_MS`
    /// - `COLLAB_SWEEP_INTERVAL_MS`
    /// - `COLLAB_MAX_USERS_PER_PROJECT`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lock_duration: env_duration_ms("COLLAB_LOCK_DURATION_MS", defaults.lock_duration),
            inactive_threshold: env_duration_ms(
                "COLLAB_INACTIVE_THRESHOLD_MS",
                defaults.inactive_threshold,
            ),
            sweep_interval: env_duration_ms("COLLAB_SWEEP_INTERVAL_MS", defaults.sweep_interval),
            max_users_per_project: std::env::var("COLLAB_MAX_USERS_PER_PROJECT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_users_per_project),
        }
    }

    /// Lock duration in milliseconds, the unit the wire timestamps use.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn lock_duration_ms(&self) -> u64 {
        self.lock_duration.as_millis() as u64
    }

    /// Inactivity threshold in milliseconds.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn inactive_threshold_ms(&self) -> u64 {
        self.inactive_threshold.as_millis() as u64
    }
}

fn env_duration_ms(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = CollabConfig::default();
        assert_eq!(config.lock_duration_ms(), 30_000);
        assert_eq!(config.inactive_threshold_ms(), 60_000);
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.max_users_per_project, 10);
    }

    #[test]
    fn palette_has_ten_distinct_colors() {
        let mut colors: Vec<_> = USER_COLORS.to_vec();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), USER_COLORS.len());
    }
}
