//! Store options
//!
//! `StoreOptions` is the builder handed to [`Store::new`](crate::Store::new)
//! or [`Store::configure`](crate::Store::configure). The serializable subset
//! can be loaded from RON through [`StoreConfig`](crate::StoreConfig).

use crate::config::StoreConfig;
use crate::module::Module;
use crate::path::KeyPath;
use crate::plugin::{Plugin, PluginEntry};
use crate::reducer::{Reducer, Registry};
use crate::state::State;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How hook phases are awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DispatchMode {
    /// Await every hook in order before the store operation continues
    #[default]
    Sequential,
    /// Run the phase on a spawned task; the store operation does not wait
    Detached,
}

/// What a failing hook does to the rest of its phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HookErrorPolicy {
    /// Log the failure and continue with the next plugin
    #[default]
    Isolate,
    /// Abort the phase and return the error from the store operation
    Propagate,
}

/// Configuration for a store
#[derive(Debug, Default)]
pub struct StoreOptions {
    pub(crate) state: State,
    pub(crate) reducers: Registry,
    pub(crate) modules: Vec<Module>,
    pub(crate) plugins: Vec<PluginEntry>,
    pub(crate) compare_state: bool,
    pub(crate) dispatch: DispatchMode,
    pub(crate) hook_timeout: Option<Duration>,
    pub(crate) hook_errors: HookErrorPolicy,
}

impl StoreOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from a loaded config file
    pub fn from_config(config: StoreConfig) -> Self {
        let mut options = Self::new()
            .state(config.state)
            .compare_state(config.compare_state)
            .dispatch(config.dispatch)
            .hook_errors(config.hook_errors);

        if let Some(ms) = config.hook_timeout_ms {
            options = options.hook_timeout(Duration::from_millis(ms));
        }

        for module in config.modules {
            let fragment = match module.namespace {
                Some(ns) => Module::namespaced(ns),
                None => Module::new(),
            };
            options = options.module(fragment.with_state(module.state));
        }

        options
    }

    /// Initial state
    pub fn state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    /// Register a top-level reducer under its own name
    pub fn reducer(mut self, reducer: Reducer) -> Self {
        self.reducers.register(reducer);
        self
    }

    /// Register a reducer at an explicit path
    pub fn reducer_at(mut self, path: KeyPath, reducer: Reducer) -> Self {
        self.reducers.insert(path, reducer);
        self
    }

    /// Add a module. Modules are folded in the order they are added.
    pub fn module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    /// Add a plugin instance
    pub fn plugin(self, plugin: impl Plugin + 'static) -> Self {
        self.plugin_arc(Arc::new(plugin))
    }

    /// Add a shared plugin instance
    pub fn plugin_arc(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(PluginEntry::Instance(plugin));
        self
    }

    /// Add a plugin built by `factory` when the store is configured
    pub fn plugin_factory<P, F>(mut self, factory: F) -> Self
    where
        P: Plugin + 'static,
        F: FnOnce() -> P + Send + 'static,
    {
        self.plugins.push(PluginEntry::Factory(Box::new(move || {
            Arc::new(factory()) as Arc<dyn Plugin>
        })));
        self
    }

    /// Add a plugin built with `P::default()` when the store is configured
    pub fn plugin_type<P>(self) -> Self
    where
        P: Plugin + Default + 'static,
    {
        self.plugin_factory(P::default)
    }

    /// Skip writes whose merged state serializes identically to the current one
    pub fn compare_state(mut self, enabled: bool) -> Self {
        self.compare_state = enabled;
        self
    }

    /// How hook phases are awaited
    pub fn dispatch(mut self, mode: DispatchMode) -> Self {
        self.dispatch = mode;
        self
    }

    /// Upper bound for a single hook in sequential dispatch
    pub fn hook_timeout(mut self, limit: Duration) -> Self {
        self.hook_timeout = Some(limit);
        self
    }

    /// What a failing hook does to the rest of its phase
    pub fn hook_errors(mut self, policy: HookErrorPolicy) -> Self {
        self.hook_errors = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Quiet;

    impl Plugin for Quiet {}

    #[test]
    fn test_defaults() {
        let options = StoreOptions::new();
        assert!(!options.compare_state);
        assert_eq!(options.dispatch, DispatchMode::Sequential);
        assert_eq!(options.hook_errors, HookErrorPolicy::Isolate);
        assert!(options.hook_timeout.is_none());
        assert!(options.plugins.is_empty());
    }

    #[test]
    fn test_plugin_entries_keep_order() {
        let options = StoreOptions::new()
            .plugin(Quiet)
            .plugin_type::<Quiet>()
            .plugin_factory(|| Quiet);

        assert!(matches!(
            options.plugins.as_slice(),
            [
                PluginEntry::Instance(_),
                PluginEntry::Factory(_),
                PluginEntry::Factory(_)
            ]
        ));
    }

    #[test]
    fn test_reducers_register_under_their_name() {
        let options = StoreOptions::new()
            .reducer(Reducer::new("increment", |_, _| State::new()))
            .reducer_at(
                KeyPath::namespaced("cart", "add"),
                Reducer::new("add", |_, _| State::new()),
            );

        assert!(options.reducers.contains(&KeyPath::local("increment")));
        assert!(options.reducers.contains(&KeyPath::namespaced("cart", "add")));
    }
}
