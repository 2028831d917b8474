//! Reducers and the reducer registry

use crate::error::{Error, Result};
use crate::path::KeyPath;
use crate::state::State;
use crate::value::Value;
use futures::future::{self, BoxFuture, FutureExt};
use indexmap::IndexMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a reducer invocation
pub type ReducerFuture = BoxFuture<'static, anyhow::Result<State>>;

type ReducerFn = dyn Fn(Arc<State>, Value) -> ReducerFuture + Send + Sync;

/// A named function from `(current state, payload)` to a partial state.
///
/// The returned partial is shallow-merged onto the store's state when the
/// reducer is run through a [`Runner`](crate::Runner). Reducers are cheap to
/// clone.
#[derive(Clone)]
pub struct Reducer {
    name: String,
    func: Arc<ReducerFn>,
}

impl Reducer {
    /// Create a synchronous reducer
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&State, Value) -> State + Send + Sync + 'static,
    {
        let func = move |state: Arc<State>, payload: Value| -> ReducerFuture {
            future::ready(Ok(f(&state, payload))).boxed()
        };
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Create an asynchronous reducer
    pub fn new_async<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<State>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<State>> + Send + 'static,
    {
        let func = move |state: Arc<State>, payload: Value| -> ReducerFuture {
            f(state, payload).boxed()
        };
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// The reducer's own name (its key when registered at top level)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the reducer against a state snapshot
    pub fn invoke(&self, state: Arc<State>, payload: Value) -> ReducerFuture {
        (self.func)(state, payload)
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer").field("name", &self.name).finish()
    }
}

/// Reducers addressed by [`KeyPath`].
///
/// `Local("x")`, `Namespaced("ns", "x")` and `Local("ns")` are distinct
/// slots, so a namespaced reducer never shadows a top-level one.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    reducers: IndexMap<KeyPath, Reducer>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reducer at an explicit path, returning the one it replaced
    pub fn insert(&mut self, path: KeyPath, reducer: Reducer) -> Option<Reducer> {
        self.reducers.insert(path, reducer)
    }

    /// Register a reducer at top level under its own name
    pub fn register(&mut self, reducer: Reducer) -> KeyPath {
        let path = KeyPath::local(reducer.name());
        self.reducers.insert(path.clone(), reducer);
        path
    }

    /// Replace every reducer under `namespace` with `reducers`
    pub fn replace_namespace(
        &mut self,
        namespace: &str,
        reducers: impl IntoIterator<Item = Reducer>,
    ) {
        self.reducers
            .retain(|path, _| path.namespace() != Some(namespace));
        for reducer in reducers {
            let path = KeyPath::namespaced(namespace, reducer.name());
            self.reducers.insert(path, reducer);
        }
    }

    /// Look up a reducer
    pub fn get(&self, path: &KeyPath) -> Option<&Reducer> {
        self.reducers.get(path)
    }

    /// Look up a reducer, failing when nothing is registered at `path`
    pub fn resolve(&self, path: &KeyPath) -> Result<&Reducer> {
        self.reducers
            .get(path)
            .ok_or_else(|| Error::UnresolvedReducer(path.to_string()))
    }

    pub fn contains(&self, path: &KeyPath) -> bool {
        self.reducers.contains_key(path)
    }

    /// Registered paths in registration order
    pub fn paths(&self) -> impl Iterator<Item = &KeyPath> {
        self.reducers.keys()
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(name: &str, value: i64) -> Reducer {
        Reducer::new(name, move |_, _| State::new().with("value", value))
    }

    #[tokio::test]
    async fn test_sync_reducer_invoke() {
        let increment = Reducer::new("increment", |state, payload| {
            let count = state.get("count").and_then(Value::as_int).unwrap_or(0);
            State::new().with("count", count + payload.as_int().unwrap_or(1))
        });

        let state = Arc::new(State::new().with("count", 2));
        let next = increment.invoke(state, Value::Int(5)).await.unwrap();
        assert_eq!(next.get("count"), Some(&Value::Int(7)));
        assert_eq!(increment.name(), "increment");
    }

    #[tokio::test]
    async fn test_async_reducer_invoke() {
        let load = Reducer::new_async("load", |_state, payload| async move {
            tokio::task::yield_now().await;
            Ok::<_, anyhow::Error>(State::new().with("loaded", payload))
        });

        let next = load.invoke(Arc::new(State::new()), "yes".into()).await.unwrap();
        assert_eq!(next.get("loaded"), Some(&Value::from("yes")));
    }

    #[test]
    fn test_local_and_namespaced_slots_are_distinct() {
        let mut registry = Registry::new();
        registry.register(constant("reset", 1));
        registry.replace_namespace("cart", [constant("reset", 2)]);
        registry.register(constant("cart", 3));

        assert_eq!(registry.len(), 3);
        assert!(registry.contains(&KeyPath::local("reset")));
        assert!(registry.contains(&KeyPath::namespaced("cart", "reset")));
        assert!(registry.contains(&KeyPath::local("cart")));
    }

    #[test]
    fn test_replace_namespace_drops_previous_entries() {
        let mut registry = Registry::new();
        registry.replace_namespace("cart", [constant("add", 1), constant("remove", 2)]);
        registry.replace_namespace("cart", [constant("clear", 3)]);

        let paths: Vec<String> = registry.paths().map(ToString::to_string).collect();
        assert_eq!(paths, vec!["cart.clear"]);
    }

    #[test]
    fn test_resolve_reports_missing() {
        let registry = Registry::new();
        let err = registry.resolve(&KeyPath::namespaced("cart", "add")).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReducer(ref p) if p == "cart.add"));
        assert!(registry.get(&KeyPath::local("add")).is_none());
    }
}
