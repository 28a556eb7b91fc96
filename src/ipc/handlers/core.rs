use crate::config::StoreConfig;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "storePath": state.store.as_ref().map(|c| c.path().to_string_lossy().to_string())
        }),
    )
}

fn handle_store_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = req.params.get("path").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let mut config = StoreConfig::new(path);
    if let Some(v) = req.params.get("busyTimeoutMs") {
        let Some(ms) = v.as_u64() else {
            return err(
                &req.id,
                "bad_params",
                "busyTimeoutMs must be a non-negative integer",
                None,
            );
        };
        config = config.with_busy_timeout_ms(ms);
    }

    match db::open_db(&config) {
        Ok(conn) => {
            info!(path = %config.path().display(), "store opened");
            let store_path = config.path().to_string_lossy().to_string();
            // Replacing the connection closes the previous store.
            state.db = Some(conn);
            state.store = Some(config);
            ok(&req.id, json!({ "storePath": store_path }))
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "store.open" => Some(handle_store_open(state, req)),
        _ => None,
    }
}
