//! RON configuration for stores
//!
//! Only the data part of [`StoreOptions`](crate::StoreOptions) can live in a
//! file: initial state, state-only modules and dispatch settings. Reducers
//! and plugins are code and are added to the options afterwards.
//!
//! ```ron
//! (
//!     state: {"count": 0},
//!     modules: [
//!         (namespace: Some("cart"), state: {"items": []}),
//!     ],
//!     compare_state: true,
//!     hook_timeout_ms: Some(500),
//! )
//! ```

use crate::error::Result;
use crate::options::{DispatchMode, HookErrorPolicy};
use crate::state::State;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Serializable store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Initial state
    pub state: State,
    /// State-only modules, folded in order
    pub modules: Vec<ModuleConfig>,
    /// Skip writes that leave the state unchanged
    pub compare_state: bool,
    /// How hook phases are awaited
    pub dispatch: DispatchMode,
    /// Per-hook timeout in milliseconds
    pub hook_timeout_ms: Option<u64>,
    /// What a failing hook does to the rest of its phase
    pub hook_errors: HookErrorPolicy,
}

/// A module as written in a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub namespace: Option<String>,
    pub state: State,
}

impl StoreConfig {
    /// Parse a config from RON text
    pub fn from_ron_str(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Load a config from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Value};
    use std::io::Write;

    const SAMPLE: &str = r#"(
        state: {"count": 0, "title": "todo"},
        modules: [
            (namespace: Some("cart"), state: {"items": [], "total": 0.0}),
        ],
        compare_state: true,
        dispatch: Detached,
        hook_timeout_ms: Some(250),
        hook_errors: Propagate,
    )"#;

    #[test]
    fn test_parse_full_config() {
        let config = StoreConfig::from_ron_str(SAMPLE).unwrap();

        assert_eq!(config.state.get("count"), Some(&Value::Int(0)));
        assert_eq!(config.state.get("title"), Some(&Value::from("todo")));
        assert_eq!(config.modules.len(), 1);
        assert_eq!(config.modules[0].namespace.as_deref(), Some("cart"));
        assert_eq!(config.modules[0].state.get("total"), Some(&Value::Float(0.0)));
        assert!(config.compare_state);
        assert_eq!(config.dispatch, DispatchMode::Detached);
        assert_eq!(config.hook_timeout_ms, Some(250));
        assert_eq!(config.hook_errors, HookErrorPolicy::Propagate);
    }

    #[test]
    fn test_missing_fields_default() {
        let config = StoreConfig::from_ron_str("()").unwrap();
        assert!(config.state.is_empty());
        assert!(!config.compare_state);
        assert_eq!(config.dispatch, DispatchMode::Sequential);
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let err = StoreConfig::from_ron_str("(state: [1, 2").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = StoreConfig::load(file.path()).unwrap();
        assert!(config.compare_state);
    }
}
