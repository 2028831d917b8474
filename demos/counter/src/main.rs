//! Counter and cart demo
//!
//! Usage: `counter [config.ron] [state-dir]`
//!
//! Runs a few reducers against a store persisted to `<state-dir>/cask.json`.
//! Run it twice to see the count picked up from the previous run. Set
//! `RUST_LOG=debug` to watch hook dispatch.

use anyhow::Context;
use cask_core::{Module, Reducer, State, Store, StoreConfig, StoreOptions, Value};
use cask_persist::{PersistConfig, PersistedState, StorageBackend};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn increment() -> Reducer {
    Reducer::new("increment", |state, payload| {
        let count = state.get("count").and_then(Value::as_int).unwrap_or(0);
        State::new().with("count", count + payload.as_int().unwrap_or(1))
    })
}

fn cart() -> Module {
    Module::namespaced("cart")
        .with_state(State::new().with("items", Vec::<Value>::new()).with("total", 0))
        .with_reducer(Reducer::new_async("add", |state, payload| async move {
            let cart = state.get("cart").and_then(Value::as_map);
            let mut items = cart
                .and_then(|c| c.get("items"))
                .and_then(Value::as_list)
                .map(<[Value]>::to_vec)
                .unwrap_or_default();
            let total = cart
                .and_then(|c| c.get("total"))
                .and_then(Value::as_int)
                .unwrap_or(0);

            // Stand-in for a price lookup.
            tokio::task::yield_now().await;
            items.push(payload);

            let cart = State::new()
                .with("items", items)
                .with("total", total + 1);
            Ok::<_, anyhow::Error>(State::new().with("cart", cart))
        }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => StoreConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => StoreConfig {
            state: State::new().with("count", 0),
            compare_state: true,
            ..StoreConfig::default()
        },
    };
    let state_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("cask-counter"));

    let persist = PersistedState::from_config(PersistConfig {
        backend: StorageBackend::File { dir: state_dir.clone() },
        ..PersistConfig::default()
    });

    let store = Store::new(
        StoreOptions::from_config(config)
            .reducer(increment())
            .module(cart())
            .plugin(persist),
    )
    .await?;

    let _count = store.subscribe("count", |state| {
        info!(count = %state.get("count").cloned().unwrap_or_default(), "count changed");
    })?;

    let increment = store.use_reducer("increment")?;
    for _ in 0..5 {
        increment.run(Value::Null).await?;
    }

    let add = store.use_reducer("cart.add")?;
    add.run("apple").await?;
    add.run("pear").await?;

    info!(
        count = %store.get("count").await?.unwrap_or_default(),
        items = %store.get("cart.items").await?.unwrap_or_default(),
        dir = %state_dir.display(),
        "done"
    );

    Ok(())
}
