use crate::error::SeedError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn seed_err(id: &str, e: &SeedError) -> serde_json::Value {
    let details = match e {
        SeedError::InvalidRecord {
            entity,
            id: record_id,
            ..
        }
        | SeedError::Insert {
            entity,
            id: record_id,
            ..
        } => Some(json!({ "entity": entity, "id": record_id })),
        SeedError::DocumentRead { path, .. } => {
            Some(json!({ "inputPath": path.to_string_lossy() }))
        }
        SeedError::DocumentParse(_) | SeedError::Store(_) => None,
    };
    err(id, e.code(), e.to_string(), details)
}
