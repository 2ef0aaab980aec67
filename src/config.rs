use std::env;

/// Engine-level configuration, loaded from the environment the way the
/// source loads its `Config`. This crate only owns the ambient knobs the
/// allocation/picking core actually has: the pick-lock TTL and sweep
/// cadence, log verbosity, and the app identity an embedding caller may
/// want to stamp on operation summaries. Database, LDAP, JWT, and CORS
/// settings belong to the source's HTTP layer and have no counterpart here.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a pick lock may be held before it is eligible for
    /// auto-release. Defaults to 600s (10 minutes) per the design.
    pub lock_ttl_secs: u64,

    /// How often the lock manager's background sweep checks for expired
    /// locks. Defaults to 30s.
    pub lock_sweep_interval_secs: u64,

    pub log_level: String,

    pub app_name: String,
    pub app_version: String,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            lock_ttl_secs: env::var("LOCK_TTL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .expect("LOCK_TTL_SECS must be a valid number"),
            lock_sweep_interval_secs: env::var("LOCK_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("LOCK_SWEEP_INTERVAL_SECS must be a valid number"),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            app_name: env::var("APP_NAME")
                .unwrap_or_else(|_| "Bin Allocation Engine".to_string()),
            app_version: env::var("APP_VERSION").unwrap_or_else(|_| "0.1.0".to_string()),
        })
    }

    /// Default configuration, used by tests and by callers that manage
    /// their own environment loading upstream.
    pub fn defaults() -> Self {
        Self {
            lock_ttl_secs: 600,
            lock_sweep_interval_secs: 30,
            log_level: "info".to_string(),
            app_name: "Bin Allocation Engine".to_string(),
            app_version: "0.1.0".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_ttl() {
        let config = EngineConfig::defaults();
        assert_eq!(config.lock_ttl_secs, 600);
        assert_eq!(config.lock_sweep_interval_secs, 30);
    }
}
