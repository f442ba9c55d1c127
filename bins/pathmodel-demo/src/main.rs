use std::sync::Arc;

use anyhow::Context;
use pathmodel_core::{set_default_store, Binding, MemoryStore, Root, Schema, Store};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,pathmodel_core=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("pathmodel demo starting...");

    let store = Arc::new(MemoryStore::new());
    let default: Arc<dyn Store> = store.clone();
    set_default_store(default);

    let root = Root::new(
        [
            (
                "users",
                Schema::node(
                    "users",
                    [(
                        "$userId",
                        Schema::var([
                            ("name", Schema::leaf("n")?),
                            ("stores", Schema::node("stores", [("$storeId", Schema::var_leaf())])?),
                        ])?,
                    )],
                )?,
            ),
            (
                "stores",
                Schema::node(
                    "stores",
                    [(
                        "$storeId",
                        Schema::var([
                            ("name", Schema::leaf("n")?),
                            ("visits", Schema::leaf("v")?),
                        ])?,
                    )],
                )?,
            ),
        ],
        Binding::new(),
    )?;

    let user = root
        .child("users")
        .and_then(|users| users.var_child())
        .context("users collection is modeled")?;
    let shop = root
        .child("stores")
        .and_then(|stores| stores.var_child())
        .context("stores collection is modeled")?;

    // Pin one user and write through the pinned copy.
    let ann = user.clone_with(&["u1"], &Binding::new())?;
    tracing::info!(template = user.path(), pinned = ann.path(), "pinned user");
    ann.at(&[]).set(&json!({"name": "Ann", "signupSource": "demo"}))?;

    let shop_id = root
        .child("stores")
        .context("stores collection is modeled")?
        .at(&[])
        .push(Some(&json!({"name": "Corner Shop", "visits": 0})))?
        .key()
        .context("pushed location has a key")?
        .to_string();
    tracing::info!(id = %shop_id, "created store");

    let mut membership = serde_json::Map::new();
    membership.insert(shop_id.clone(), json!(true));
    let ann_stores = ann.child("stores").context("user stores are modeled")?;
    ann_stores.at(&[]).update(&membership.into())?;

    let sub = shop.at(&[shop_id.as_str()]).on_value(|value| {
        tracing::info!(?value, "store changed");
    })?;

    for _ in 0..3 {
        let outcome = shop.at(&[shop_id.as_str()]).transaction(|current| {
            let mut current = current?;
            let visits = current.get("visits").and_then(|v| v.as_i64()).unwrap_or(0);
            current["visits"] = json!(visits + 1);
            Some(current)
        })?;
        tracing::info!(committed = outcome.committed, snapshot = ?outcome.snapshot, "visit recorded");
    }
    sub.off();

    let connected = root.on_connected(|connected| tracing::info!(connected, "connection state"), None)?;
    store.set_connected(false)?;
    store.set_connected(true)?;
    connected.off();

    tracing::info!(user = ?ann.at(&[]).get()?, "user, all data");
    tracing::info!(user = ?ann.at(&[]).get_modeled()?, "user, modeled only");
    let users = root.child("users").context("users collection is modeled")?;
    let name = ann.child("name").context("name is modeled")?;
    tracing::info!(
        leaves = store.leaf_count()?,
        name_below_users = %users.path_to(name, &[])?,
        "final state"
    );
    tracing::info!("{}", serde_json::to_string_pretty(&store.snapshot()?)?);

    Ok(())
}
