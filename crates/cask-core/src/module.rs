//! Configuration fragments contributing state and reducers

use crate::reducer::{Reducer, Registry};
use crate::state::State;

/// A bundle of state and reducers folded into a store at configure time.
///
/// Without a namespace, module state is spread over the top-level state and
/// module reducers are registered at top level, overwriting on conflict.
/// With a namespace, the module's state replaces `state[namespace]` and its
/// reducers replace everything previously registered under that namespace.
#[derive(Debug, Clone, Default)]
pub struct Module {
    namespace: Option<String>,
    state: Option<State>,
    reducers: Option<Vec<Reducer>>,
}

impl Module {
    /// Create a module without a namespace
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a module scoped under `namespace`
    pub fn namespaced(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    /// Set the module's state
    pub fn with_state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    /// Add a reducer to the module
    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducers.get_or_insert_with(Vec::new).push(reducer);
        self
    }

    /// The namespace, if any. An empty namespace counts as none.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// Fold this module into the combined state and registry
    pub(crate) fn fold_into(self, state: &mut State, registry: &mut Registry) {
        let namespace = self.namespace().map(str::to_owned);

        if let Some(module_state) = self.state {
            match &namespace {
                Some(ns) => state.nest(ns.clone(), module_state),
                None => state.merge(module_state),
            }
        }

        if let Some(reducers) = self.reducers {
            match &namespace {
                Some(ns) => registry.replace_namespace(ns, reducers),
                None => {
                    for reducer in reducers {
                        registry.register(reducer);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyPath, Value};

    fn noop(name: &str) -> Reducer {
        Reducer::new(name, |_, _| State::new())
    }

    #[test]
    fn test_unnamespaced_module_spreads() {
        let mut state = State::new().with("a", 1).with("b", 2);
        let mut registry = Registry::new();

        Module::new()
            .with_state(State::new().with("b", 20).with("c", 3))
            .with_reducer(noop("touch"))
            .fold_into(&mut state, &mut registry);

        assert_eq!(state.get("a"), Some(&Value::Int(1)));
        assert_eq!(state.get("b"), Some(&Value::Int(20)));
        assert_eq!(state.get("c"), Some(&Value::Int(3)));
        assert!(registry.contains(&KeyPath::local("touch")));
    }

    #[test]
    fn test_namespaced_module_nests_and_replaces() {
        let mut state = State::new().with("cart", "old");
        let mut registry = Registry::new();

        Module::namespaced("cart")
            .with_state(State::new().with("items", Vec::<Value>::new()))
            .with_reducer(noop("add"))
            .fold_into(&mut state, &mut registry);

        let cart = state.get("cart").and_then(Value::as_map).unwrap();
        assert_eq!(cart.get("items"), Some(&Value::List(vec![])));
        assert!(registry.contains(&KeyPath::namespaced("cart", "add")));
        assert!(!registry.contains(&KeyPath::local("add")));
    }

    #[test]
    fn test_empty_namespace_is_top_level() {
        let module = Module::namespaced("").with_state(State::new().with("x", 1));
        assert_eq!(module.namespace(), None);

        let mut state = State::new();
        module.fold_into(&mut state, &mut Registry::new());
        assert_eq!(state.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_module_without_state_leaves_namespace_alone() {
        let mut state = State::new().with("cart", 1);
        Module::namespaced("cart")
            .with_reducer(noop("add"))
            .fold_into(&mut state, &mut Registry::new());
        assert_eq!(state.get("cart"), Some(&Value::Int(1)));
    }
}
