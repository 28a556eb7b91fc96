use crate::config::LoadOptions;
use crate::db;
use crate::ipc::error::{err, ok, seed_err};
use crate::ipc::types::{AppState, Request};
use crate::seed;
use serde_json::json;
use std::path::PathBuf;

fn handle_seed_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_store", "open a store first (store.open)", None);
    };
    let Some(input) = req
        .params
        .get("inputPath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
    else {
        return err(&req.id, "bad_params", "missing params.inputPath", None);
    };
    let opts = LoadOptions {
        dry_run: req
            .params
            .get("dryRun")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
    };

    match seed::load_file(conn, &input, &opts) {
        Ok(report) => ok(
            &req.id,
            json!({
                "runId": report.run_id,
                "inputDigest": report.input_digest,
                "committed": report.committed,
                "inserted": report.total_inserted(),
                "skipped": report.total_skipped(),
                "entities": report.entities,
            }),
        ),
        Err(e) => seed_err(&req.id, &e),
    }
}

fn handle_seed_counts(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_store", "open a store first (store.open)", None);
    };
    match db::table_counts(conn) {
        Ok(counts) => {
            let mut map = serde_json::Map::new();
            for (table, n) in counts {
                map.insert(table.to_string(), json!(n));
            }
            ok(&req.id, json!({ "counts": map }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "seed.load" => Some(handle_seed_load(state, req)),
        "seed.counts" => Some(handle_seed_counts(state, req)),
        _ => None,
    }
}
