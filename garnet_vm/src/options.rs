//! Runtime options.
//!
//! Options are resolved once when a [`RuntimeContext`](crate::RuntimeContext)
//! is created and never change afterwards.
//!
//! ```ignore
//! use garnet_vm::RuntimeOptions;
//!
//! // Small caches for a test that wants to see megamorphic sites early
//! let options = RuntimeOptions {
//!     dispatch_cache_limit: 2,
//!     ..Default::default()
//! };
//! ```

use thiserror::Error;
use tracing::debug;

/// Default number of entries a call site may hold.
pub const DEFAULT_DISPATCH_CACHE_LIMIT: usize = 8;

/// Largest accepted call-site limit.
pub const MAX_DISPATCH_CACHE_LIMIT: usize = 64;

const ENV_DISPATCH_CACHE: &str = "GARNET_DISPATCH_CACHE";
const ENV_LOOKUP_CACHE: &str = "GARNET_LOOKUP_CACHE";
const ENV_OPTIONS_LOG: &str = "GARNET_OPTIONS_LOG";

/// Errors from option resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("{var}: expected an integer in 0..={max}, got '{value}'")]
    InvalidLimit {
        var: &'static str,
        value: String,
        max: usize,
    },

    #[error("{var}: expected a boolean, got '{value}'")]
    InvalidBool { var: &'static str, value: String },
}

/// Dispatch engine options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Maximum entries per call-site chain before the site goes megamorphic.
    ///
    /// `0` disables call-site caching entirely.
    ///
    /// Default: 8
    pub dispatch_cache_limit: usize,

    /// Memoize ancestor walks per `(class, name)`.
    ///
    /// Default: true
    pub lookup_cache: bool,

    /// Log every resolved option at context creation.
    ///
    /// Default: false
    pub options_log: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            dispatch_cache_limit: DEFAULT_DISPATCH_CACHE_LIMIT,
            lookup_cache: true,
            options_log: false,
        }
    }
}

impl RuntimeOptions {
    /// Defaults overridden by `GARNET_*` environment variables.
    pub fn from_env() -> Result<Self, OptionsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, OptionsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(value) = lookup(ENV_DISPATCH_CACHE) {
            options.dispatch_cache_limit = parse_limit(ENV_DISPATCH_CACHE, &value)?;
        }
        if let Some(value) = lookup(ENV_LOOKUP_CACHE) {
            options.lookup_cache = parse_bool(ENV_LOOKUP_CACHE, &value)?;
        }
        if let Some(value) = lookup(ENV_OPTIONS_LOG) {
            options.options_log = parse_bool(ENV_OPTIONS_LOG, &value)?;
        }

        Ok(options)
    }

    /// Emit the resolved options when `options_log` is set.
    pub fn log_options(&self) {
        if !self.options_log {
            return;
        }
        debug!(
            dispatch_cache_limit = self.dispatch_cache_limit,
            lookup_cache = self.lookup_cache,
            "runtime options"
        );
    }
}

fn parse_limit(var: &'static str, value: &str) -> Result<usize, OptionsError> {
    match value.trim().parse::<usize>() {
        Ok(limit) if limit <= MAX_DISPATCH_CACHE_LIMIT => Ok(limit),
        _ => Err(OptionsError::InvalidLimit {
            var,
            value: value.to_string(),
            max: MAX_DISPATCH_CACHE_LIMIT,
        }),
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, OptionsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "" | "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(OptionsError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = RuntimeOptions::default();
        assert_eq!(options.dispatch_cache_limit, 8);
        assert!(options.lookup_cache);
        assert!(!options.options_log);
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let options = RuntimeOptions::from_lookup(env(&[])).unwrap();
        assert_eq!(options, RuntimeOptions::default());
    }

    #[test]
    fn test_overrides() {
        let options = RuntimeOptions::from_lookup(env(&[
            ("GARNET_DISPATCH_CACHE", "3"),
            ("GARNET_LOOKUP_CACHE", "off"),
            ("GARNET_OPTIONS_LOG", "1"),
        ]))
        .unwrap();
        assert_eq!(options.dispatch_cache_limit, 3);
        assert!(!options.lookup_cache);
        assert!(options.options_log);
    }

    #[test]
    fn test_zero_limit_is_accepted() {
        let options = RuntimeOptions::from_lookup(env(&[("GARNET_DISPATCH_CACHE", "0")])).unwrap();
        assert_eq!(options.dispatch_cache_limit, 0);
    }

    #[test]
    fn test_malformed_limit() {
        let err = RuntimeOptions::from_lookup(env(&[("GARNET_DISPATCH_CACHE", "lots")])).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidLimit { .. }));
        assert!(err.to_string().starts_with("GARNET_DISPATCH_CACHE"));

        let err = RuntimeOptions::from_lookup(env(&[("GARNET_DISPATCH_CACHE", "65")])).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidLimit { max: 64, .. }));
    }

    #[test]
    fn test_malformed_bool() {
        let err = RuntimeOptions::from_lookup(env(&[("GARNET_LOOKUP_CACHE", "maybe")])).unwrap_err();
        assert_eq!(
            err,
            OptionsError::InvalidBool {
                var: "GARNET_LOOKUP_CACHE",
                value: "maybe".into()
            }
        );
    }
}
