//! Database configuration.

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial capacity of each transaction's published handle cache.
    pub cache_capacity: usize,

    /// Handle publications between sweeps of dead cache entries (0 = never).
    pub cache_sweep_interval: usize,

    /// Whether to validate the schema when opening a database.
    pub verify_schema_on_open: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: 64,
            cache_sweep_interval: 1024,
            verify_schema_on_open: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial handle cache capacity.
    #[must_use]
    pub const fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets how many publications pass between dead-entry sweeps.
    #[must_use]
    pub const fn cache_sweep_interval(mut self, interval: usize) -> Self {
        self.cache_sweep_interval = interval;
        self
    }

    /// Sets whether to validate the schema on open.
    #[must_use]
    pub const fn verify_schema_on_open(mut self, value: bool) -> Self {
        self.verify_schema_on_open = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.cache_capacity, 64);
        assert_eq!(config.cache_sweep_interval, 1024);
        assert!(config.verify_schema_on_open);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .cache_capacity(8)
            .cache_sweep_interval(0)
            .verify_schema_on_open(false);

        assert_eq!(config.cache_capacity, 8);
        assert_eq!(config.cache_sweep_interval, 0);
        assert!(!config.verify_schema_on_open);
    }
}
