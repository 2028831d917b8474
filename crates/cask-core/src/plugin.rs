//! Lifecycle plugins and hook dispatch
//!
//! A plugin implements any subset of the five hooks; the rest default to
//! no-ops. Hooks run in plugin registration order. How a phase is awaited and
//! what happens when a hook fails is decided by [`DispatchMode`] and
//! [`HookErrorPolicy`].

use crate::error::{Error, Result};
use crate::options::{DispatchMode, HookErrorPolicy};
use crate::path::KeyPath;
use crate::state::State;
use crate::store::Store;
use crate::value::Value;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The five lifecycle notification points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Ready,
    Save,
    Read,
    ReducerInvoke,
    Reset,
}

impl Hook {
    /// Method name of the hook
    pub fn name(&self) -> &'static str {
        match self {
            Hook::Ready => "on_ready",
            Hook::Save => "on_save",
            Hook::Read => "on_read",
            Hook::ReducerInvoke => "on_reducer_invoke",
            Hook::Reset => "on_reset",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a plugin sees on every path read
#[derive(Debug, Clone, PartialEq)]
pub struct ReadEvent {
    /// The requested path
    pub path: KeyPath,
    /// The value it resolved to
    pub value: Option<Value>,
}

/// Lifecycle hooks fired around store operations.
///
/// Every hook receives the store it was fired by, so a plugin may read from
/// or write back into it. Writes issued from a hook go through the normal
/// `set` path and fire `on_save` again.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Fired once after configuration, with the initial state
    async fn on_ready(&self, _store: &Store, _state: &State) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fired on every write with the merged candidate state, before the
    /// unchanged-state short-circuit
    async fn on_save(&self, _store: &Store, _state: &State) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fired on every path read
    async fn on_read(&self, _store: &Store, _event: &ReadEvent) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fired before a reducer runs, with the state it will receive
    async fn on_reducer_invoke(&self, _store: &Store, _state: &State) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fired on reset with the default state, before the reset's own save
    async fn on_reset(&self, _store: &Store, _default_state: &State) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A plugin as supplied in store options: either a ready instance or a
/// factory invoked once, with no arguments, at configure time.
pub enum PluginEntry {
    Instance(Arc<dyn Plugin>),
    Factory(Box<dyn FnOnce() -> Arc<dyn Plugin> + Send>),
}

impl PluginEntry {
    pub(crate) fn instantiate(self) -> Arc<dyn Plugin> {
        match self {
            PluginEntry::Instance(plugin) => plugin,
            PluginEntry::Factory(make) => make(),
        }
    }
}

impl fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginEntry::Instance(plugin) => f.debug_tuple("Instance").field(&plugin.name()).finish(),
            PluginEntry::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// One hook invocation, with its argument
#[derive(Debug, Clone)]
pub(crate) enum HookCall {
    Ready(Arc<State>),
    Save(Arc<State>),
    Read(ReadEvent),
    ReducerInvoke(Arc<State>),
    Reset(Arc<State>),
}

impl HookCall {
    pub(crate) fn hook(&self) -> Hook {
        match self {
            HookCall::Ready(_) => Hook::Ready,
            HookCall::Save(_) => Hook::Save,
            HookCall::Read(_) => Hook::Read,
            HookCall::ReducerInvoke(_) => Hook::ReducerInvoke,
            HookCall::Reset(_) => Hook::Reset,
        }
    }

    async fn invoke(&self, plugin: &dyn Plugin, store: &Store) -> anyhow::Result<()> {
        match self {
            HookCall::Ready(state) => plugin.on_ready(store, state).await,
            HookCall::Save(state) => plugin.on_save(store, state).await,
            HookCall::Read(event) => plugin.on_read(store, event).await,
            HookCall::ReducerInvoke(state) => plugin.on_reducer_invoke(store, state).await,
            HookCall::Reset(state) => plugin.on_reset(store, state).await,
        }
    }
}

/// Delivers hook calls to the plugin list
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Dispatcher {
    pub(crate) mode: DispatchMode,
    pub(crate) timeout: Option<Duration>,
    pub(crate) policy: HookErrorPolicy,
}

impl Dispatcher {
    pub(crate) async fn dispatch(
        &self,
        store: &Store,
        plugins: Arc<[Arc<dyn Plugin>]>,
        call: HookCall,
    ) -> Result<()> {
        if plugins.is_empty() {
            return Ok(());
        }

        match self.mode {
            DispatchMode::Sequential => run_phase(*self, store, &plugins, &call).await,
            DispatchMode::Detached => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let dispatcher = *self;
                    let store = store.clone();
                    handle.spawn(async move {
                        if let Err(err) = run_phase(dispatcher, &store, &plugins, &call).await {
                            warn!(hook = %call.hook(), error = %err, "detached hook phase aborted");
                        }
                    });
                    Ok(())
                }
                Err(_) => {
                    debug!(hook = %call.hook(), "no async runtime, dispatching inline");
                    run_phase(*self, store, &plugins, &call).await
                }
            },
        }
    }
}

async fn run_phase(
    dispatcher: Dispatcher,
    store: &Store,
    plugins: &[Arc<dyn Plugin>],
    call: &HookCall,
) -> Result<()> {
    let hook = call.hook();

    for plugin in plugins {
        let name = plugin.name();
        debug!(plugin = name, %hook, "dispatching hook");

        let outcome = match dispatcher.timeout {
            Some(limit) => match tokio::time::timeout(limit, call.invoke(plugin.as_ref(), store)).await {
                Ok(result) => result.map_err(|err| hook_error(name, hook, err)),
                Err(_) => Err(Error::HookTimeout {
                    plugin: name.to_string(),
                    hook: hook.name(),
                }),
            },
            None => call
                .invoke(plugin.as_ref(), store)
                .await
                .map_err(|err| hook_error(name, hook, err)),
        };

        if let Err(err) = outcome {
            match dispatcher.policy {
                HookErrorPolicy::Isolate => {
                    warn!(plugin = name, %hook, error = %err, "plugin hook failed");
                }
                HookErrorPolicy::Propagate => return Err(err),
            }
        }
    }

    Ok(())
}

fn hook_error(plugin: &str, hook: Hook, err: anyhow::Error) -> Error {
    Error::PluginHook {
        plugin: plugin.to_string(),
        hook: hook.name(),
        message: format!("{err:#}"),
    }
}
