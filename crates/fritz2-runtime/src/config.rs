#![forbid(unsafe_code)]

//! Runtime-wide policies.
//!
//! A [`RuntimeConfig`] is a plain value. The [`Runtime`](crate::Runtime) keeps
//! it in a `RootStore<RuntimeConfig>`, so changing a policy goes through that
//! store's handlers like any other state change and is observable.
//!
//! # Serialization
//!
//! With the `policy-config` feature enabled, the config derives `Serialize`
//! and `Deserialize` and can be loaded from TOML or JSON. Missing keys fall
//! back to their defaults.

#[cfg(feature = "policy-config")]
use std::path::Path;

#[cfg(feature = "policy-config")]
use crate::error::ConfigError;

/// What a root store does with a failed reducer when no custom error handler
/// was installed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum StoreErrorPolicy {
    /// Log at `error` level and keep the prior state.
    #[default]
    LogAndKeep,
    /// Keep the prior state without logging.
    KeepSilently,
}

/// What a mount point does with a failed render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum RenderErrorPolicy {
    /// Log, count, keep the previously rendered content.
    #[default]
    ReportAndContinue,
    /// Log, count, clear the target so stale content is not shown.
    ClearAndContinue,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RuntimeConfig {
    pub store_errors: StoreErrorPolicy,
    pub render_errors: RenderErrorPolicy,
    /// Emit a `trace` event for every applied store update.
    pub trace_updates: bool,
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_store_errors(mut self, policy: StoreErrorPolicy) -> Self {
        self.store_errors = policy;
        self
    }

    #[must_use]
    pub fn with_render_errors(mut self, policy: RenderErrorPolicy) -> Self {
        self.render_errors = policy;
        self
    }

    #[must_use]
    pub fn with_trace_updates(mut self, enabled: bool) -> Self {
        self.trace_updates = enabled;
        self
    }
}

#[cfg(feature = "policy-config")]
impl RuntimeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load from a `.toml` or `.json` file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_report_and_keep() {
        let config = RuntimeConfig::default();
        assert_eq!(config.store_errors, StoreErrorPolicy::LogAndKeep);
        assert_eq!(config.render_errors, RenderErrorPolicy::ReportAndContinue);
        assert!(!config.trace_updates);
    }

    #[test]
    fn builders_override_fields() {
        let config = RuntimeConfig::default()
            .with_store_errors(StoreErrorPolicy::KeepSilently)
            .with_render_errors(RenderErrorPolicy::ClearAndContinue)
            .with_trace_updates(true);
        assert_eq!(config.store_errors, StoreErrorPolicy::KeepSilently);
        assert_eq!(config.render_errors, RenderErrorPolicy::ClearAndContinue);
        assert!(config.trace_updates);
    }

    #[cfg(feature = "policy-config")]
    mod serialized {
        use super::*;
        use std::io::Write;

        #[test]
        fn toml_with_missing_keys_uses_defaults() {
            let config = RuntimeConfig::from_toml_str("render_errors = \"clear-and-continue\"\n")
                .unwrap();
            assert_eq!(config.render_errors, RenderErrorPolicy::ClearAndContinue);
            assert_eq!(config.store_errors, StoreErrorPolicy::LogAndKeep);
        }

        #[test]
        fn json_round_trips_through_toml() {
            let config =
                RuntimeConfig::from_json_str(r#"{"store_errors":"keep-silently","trace_updates":true}"#)
                    .unwrap();
            let text = config.to_toml_string().unwrap();
            assert_eq!(RuntimeConfig::from_toml_str(&text).unwrap(), config);
        }

        #[test]
        fn load_picks_format_by_extension() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("fritz2.toml");
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "trace_updates = true").unwrap();
            assert!(RuntimeConfig::load(&path).unwrap().trace_updates);

            let other = dir.path().join("fritz2.yaml");
            std::fs::write(&other, "trace_updates: true").unwrap();
            assert!(matches!(
                RuntimeConfig::load(&other),
                Err(ConfigError::UnsupportedFormat { .. })
            ));
        }

        #[test]
        fn bad_toml_is_a_typed_error() {
            assert!(matches!(
                RuntimeConfig::from_toml_str("store_errors = 3"),
                Err(ConfigError::Toml(_))
            ));
        }
    }
}
