use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use upline_core::SNAPSHOT_FORMAT_VERSION;

/// SHA-256 over the compact JSON form. Emitted snapshots have sorted
/// keys, so equal snapshots always hash the same.
pub fn compute_etag(snapshot: &Value) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_string(snapshot)?;
    let hash = Sha256::digest(canonical.as_bytes());
    Ok(format!("{:x}", hash))
}

/// Wrap an emitted snapshot in an envelope carrying its etag.
pub fn build_manifest(snapshot: Value) -> Result<Value, serde_json::Error> {
    let etag = compute_etag(&snapshot)?;
    let mut map = Map::new();
    map.insert("etag".to_string(), Value::String(etag));
    map.insert(
        "format".to_string(),
        Value::String(SNAPSHOT_FORMAT_VERSION.to_string()),
    );
    map.insert("snapshot".to_string(), snapshot);
    Ok(Value::Object(map))
}
