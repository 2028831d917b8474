//! Cask Core - Shared state store with a lifecycle plugin pipeline
//!
//! This crate provides the store and everything it is configured with:
//! - Dynamic value types (`Value`, `ValueMap`) and the `State` map
//! - Reducers, addressed by `KeyPath` and optionally namespaced by modules
//! - Plugins observing `on_ready`, `on_save`, `on_read`,
//!   `on_reducer_invoke` and `on_reset`
//! - An opt-in short-circuit for writes that leave the state unchanged
//! - Change subscriptions and RON configuration files
//!
//! ## Example
//!
//! ```no_run
//! use cask_core::{Reducer, State, Store, StoreOptions, Value};
//!
//! # async fn run() -> cask_core::Result<()> {
//! let store = Store::new(
//!     StoreOptions::new()
//!         .state(State::new().with("count", 0))
//!         .reducer(Reducer::new("increment", |state, _| {
//!             let count = state.get("count").and_then(Value::as_int).unwrap_or(0);
//!             State::new().with("count", count + 1)
//!         })),
//! )
//! .await?;
//!
//! store.use_reducer("increment")?.run(Value::Null).await?;
//! assert_eq!(store.get("count").await?, Some(Value::Int(1)));
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod module;
mod options;
mod path;
mod plugin;
mod reducer;
mod state;
mod store;
mod subscription;
mod value;

pub use config::{ModuleConfig, StoreConfig};
pub use error::{Error, Result};
pub use module::Module;
pub use options::{DispatchMode, HookErrorPolicy, StoreOptions};
pub use path::{IntoKeyPath, KeyPath};
pub use plugin::{Hook, Plugin, PluginEntry, ReadEvent};
pub use reducer::{Reducer, ReducerFuture, Registry};
pub use state::State;
pub use store::{Runner, SetOutcome, Store};
pub use subscription::Subscription;
pub use value::{Value, ValueMap};

/// Re-exported so plugins can be written without a direct dependency
pub use async_trait::async_trait;
