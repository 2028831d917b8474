//! The state store
//!
//! A [`Store`] is a cheap, cloneable handle to one shared state container.
//! All writes go through [`Store::set`]: the partial state is shallow-merged
//! onto the current state, `on_save` is dispatched with the merged candidate,
//! and the candidate then replaces the current state as a whole.
//!
//! Locks are only held for short synchronous sections and never while a hook
//! or reducer is awaited, so plugins may freely call back into the store.

use crate::error::{Error, Result};
use crate::options::StoreOptions;
use crate::path::{IntoKeyPath, KeyPath};
use crate::plugin::{Dispatcher, HookCall, Plugin, ReadEvent};
use crate::reducer::{Reducer, Registry};
use crate::state::State;
use crate::subscription::{Observers, Subscription};
use crate::value::Value;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Outcome of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The merged state replaced the current state
    Committed,
    /// `compare_state` is on and the merged state equals the current one
    Unchanged,
}

impl SetOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SetOutcome::Committed)
    }
}

/// Everything a configure call replaces
struct Engine {
    /// Snapshot of the initial state; restored by `reset`
    default_state: Arc<State>,
    state: Arc<State>,
    reducers: Registry,
    compare_state: bool,
    plugins: Arc<[Arc<dyn Plugin>]>,
    dispatcher: Dispatcher,
}

impl Default for Engine {
    fn default() -> Self {
        let empty = Arc::new(State::new());
        Self {
            default_state: Arc::clone(&empty),
            state: empty,
            reducers: Registry::new(),
            compare_state: false,
            plugins: Arc::from(Vec::new()),
            dispatcher: Dispatcher::default(),
        }
    }
}

struct Inner {
    engine: RwLock<Engine>,
    observers: Arc<Observers>,
}

/// Shared state container with reducers and lifecycle plugins
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Create and configure a store
    pub async fn new(options: StoreOptions) -> Result<Self> {
        let store = Self::unconfigured();
        store.configure(options).await?;
        Ok(store)
    }

    /// Create an empty store with no plugins
    pub fn unconfigured() -> Self {
        Self {
            inner: Arc::new(Inner {
                engine: RwLock::new(Engine::default()),
                observers: Arc::new(Observers::default()),
            }),
        }
    }

    /// (Re)initialize the store.
    ///
    /// Folds the modules into the initial state and reducers, freezes the
    /// result as the default state, instantiates the plugins and fires
    /// `on_ready`. Everything from a previous configure is discarded, except
    /// observers registered with [`subscribe`](Store::subscribe).
    pub async fn configure(&self, options: StoreOptions) -> Result<()> {
        let StoreOptions {
            mut state,
            mut reducers,
            modules,
            plugins,
            compare_state,
            dispatch,
            hook_timeout,
            hook_errors,
        } = options;

        for module in modules {
            module.fold_into(&mut state, &mut reducers);
        }

        let plugins: Vec<Arc<dyn Plugin>> =
            plugins.into_iter().map(|entry| entry.instantiate()).collect();
        let state = Arc::new(state);

        debug!(
            keys = state.len(),
            reducers = reducers.len(),
            plugins = plugins.len(),
            compare_state,
            "configuring store"
        );

        let previous = {
            let mut engine = self.write();
            let previous = Arc::clone(&engine.state);
            *engine = Engine {
                default_state: Arc::clone(&state),
                state: Arc::clone(&state),
                reducers,
                compare_state,
                plugins: Arc::from(plugins),
                dispatcher: Dispatcher {
                    mode: dispatch,
                    timeout: hook_timeout,
                    policy: hook_errors,
                },
            };
            previous
        };

        self.inner.observers.notify(&previous, &state);
        self.dispatch(HookCall::Ready(state)).await
    }

    /// The whole current state.
    ///
    /// Returns the shared snapshot itself; later writes replace the store's
    /// snapshot and leave this one untouched. Fires no hook.
    pub fn state(&self) -> Arc<State> {
        Arc::clone(&self.read().state)
    }

    /// The state captured at the last configure
    pub fn default_state(&self) -> Arc<State> {
        Arc::clone(&self.read().default_state)
    }

    /// Whether unchanged writes are skipped
    pub fn compare_state(&self) -> bool {
        self.read().compare_state
    }

    /// Number of active plugins
    pub fn plugin_count(&self) -> usize {
        self.read().plugins.len()
    }

    /// Read the value at a one- or two-segment path and fire `on_read`.
    ///
    /// Missing keys resolve to `None`; a nested read under a non-map value
    /// is an [`Error::NotAMap`].
    pub async fn get(&self, path: impl IntoKeyPath) -> Result<Option<Value>> {
        let path = path.into_key_path()?;
        let value = self.state().lookup(&path)?.cloned();

        self.dispatch(HookCall::Read(ReadEvent {
            path,
            value: value.clone(),
        }))
        .await?;

        Ok(value)
    }

    /// Shallow-merge `patch` onto the current state.
    ///
    /// `on_save` sees the merge against the state current when the call
    /// starts. The commit merges `patch` again, onto the state current after
    /// the hooks finished, so writes made meanwhile by hooks or other callers
    /// are kept.
    pub async fn set(&self, patch: State) -> Result<SetOutcome> {
        let candidate = Arc::new(self.state().merged(&patch));
        self.dispatch(HookCall::Save(candidate)).await?;

        let (previous, next) = {
            let mut engine = self.write();
            let previous = Arc::clone(&engine.state);
            let next = previous.merged(&patch);
            if engine.compare_state && next.canonical_eq(&previous)? {
                debug!("write leaves state unchanged, skipping");
                return Ok(SetOutcome::Unchanged);
            }
            let next = Arc::new(next);
            engine.state = Arc::clone(&next);
            (previous, next)
        };
        debug!(keys = patch.len(), "state committed");

        self.inner.observers.notify(&previous, &next);
        Ok(SetOutcome::Committed)
    }

    /// Compute a partial state from the current one and merge it
    pub async fn set_with<F>(&self, f: F) -> Result<SetOutcome>
    where
        F: FnOnce(&State) -> State + Send,
    {
        let patch = f(&self.state());
        self.set(patch).await
    }

    /// Fire `on_reset` with the default state, then write it back
    pub async fn reset(&self) -> Result<SetOutcome> {
        let default_state = self.default_state();
        self.dispatch(HookCall::Reset(Arc::clone(&default_state)))
            .await?;
        self.set(State::clone(&default_state)).await
    }

    /// Look up a registered reducer
    pub fn reducer(&self, path: impl IntoKeyPath) -> Result<Reducer> {
        let path = path.into_key_path()?;
        self.read().reducers.resolve(&path).cloned()
    }

    /// Wrap a registered reducer in a [`Runner`]
    pub fn use_reducer(&self, path: impl IntoKeyPath) -> Result<Runner> {
        let reducer = self.reducer(path)?;
        Ok(Runner {
            store: self.clone(),
            reducer,
        })
    }

    /// Register `reducer` at top level under its own name and wrap it
    pub fn use_reducer_fn(&self, reducer: Reducer) -> Runner {
        let path = self.write().reducers.register(reducer.clone());
        debug!(%path, "registered reducer");
        Runner {
            store: self.clone(),
            reducer,
        }
    }

    /// Paths of all registered reducers
    pub fn reducer_paths(&self) -> Vec<KeyPath> {
        self.read().reducers.paths().cloned().collect()
    }

    /// Number of registered observers
    pub fn subscriber_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Observe committed changes to the value at `path`
    pub fn subscribe<F>(&self, path: impl IntoKeyPath, callback: F) -> Result<Subscription>
    where
        F: Fn(&State) + Send + Sync + 'static,
    {
        let path = path.into_key_path()?;
        Ok(self.inner.observers.add(Some(path), Arc::new(callback)))
    }

    /// Observe every committed change
    pub fn subscribe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&State) + Send + Sync + 'static,
    {
        self.inner.observers.add(None, Arc::new(callback))
    }

    async fn dispatch(&self, call: HookCall) -> Result<()> {
        let (dispatcher, plugins) = {
            let engine = self.read();
            (engine.dispatcher, Arc::clone(&engine.plugins))
        };
        dispatcher.dispatch(self, plugins, call).await
    }

    fn read(&self) -> RwLockReadGuard<'_, Engine> {
        self.inner
            .engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Engine> {
        self.inner
            .engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::unconfigured()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engine = self.read();
        f.debug_struct("Store")
            .field("state", &engine.state)
            .field("reducers", &engine.reducers.len())
            .field("plugins", &engine.plugins.len())
            .field("compare_state", &engine.compare_state)
            .finish()
    }
}

/// A reducer bound to a store.
///
/// Each run hands the reducer the current state and the payload, awaits its
/// result and commits it with [`Store::set`]. Nothing is written until the
/// reducer has finished.
#[derive(Clone, Debug)]
pub struct Runner {
    store: Store,
    reducer: Reducer,
}

impl Runner {
    /// Name of the wrapped reducer
    pub fn name(&self) -> &str {
        self.reducer.name()
    }

    /// Run the reducer and commit its result
    pub async fn run(&self, payload: impl Into<Value>) -> Result<SetOutcome> {
        let payload = payload.into();
        let current = self.store.state();

        self.store
            .dispatch(HookCall::ReducerInvoke(Arc::clone(&current)))
            .await?;

        let next = self
            .reducer
            .invoke(current, payload)
            .await
            .map_err(|err| Error::Reducer {
                name: self.reducer.name().to_string(),
                message: format!("{err:#}"),
            })?;

        self.store.set(next).await
    }
}
