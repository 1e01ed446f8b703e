//! Configuration loading and representation.

/// Environment variable holding the number of times a conflicting command is retried.
pub const MAX_CONFLICT_RETRIES_ENV: &str = "SOURCEFOLD_MAX_CONFLICT_RETRIES";

const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// Settings for [`crate::repository::AggregateRepository`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// How many times `execute` reloads and re-runs a command after an optimistic
    /// concurrency conflict before giving up. `0` disables retries.
    pub max_conflict_retries: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

impl RepositoryConfig {
    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_CONFLICT_RETRIES_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(n) => config.max_conflict_retries = n,
                Err(e) => tracing::warn!(
                    value = %raw,
                    error = %e,
                    default = config.max_conflict_retries,
                    "ignoring invalid {MAX_CONFLICT_RETRIES_ENV}"
                ),
            }
        }

        config
    }

    pub fn with_max_conflict_retries(mut self, n: u32) -> Self {
        self.max_conflict_retries = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = RepositoryConfig::from_lookup(|_| None);
        assert_eq!(config, RepositoryConfig::default());
        assert_eq!(config.max_conflict_retries, 3);
    }

    #[test]
    fn parses_retry_count() {
        let config = RepositoryConfig::from_lookup(|key| {
            (key == MAX_CONFLICT_RETRIES_ENV).then(|| " 7 ".to_string())
        });
        assert_eq!(config.max_conflict_retries, 7);
    }

    #[test]
    fn invalid_value_falls_back_to_default() {
        let config = RepositoryConfig::from_lookup(|_| Some("lots".to_string()));
        assert_eq!(config.max_conflict_retries, 3);
    }
}
