use std::{fs, io::Write};

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::time::{sleep, Duration};

use crate::state::kv::{Entry, InnerMap, MemoryStore};

/// Load snapshot from disk into the memory store, replacing its content.
///
/// A missing or unreadable snapshot leaves the store empty.
pub async fn load_snapshot(path: &str, store: &MemoryStore) {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(_) => {
            tracing::info!("No snapshot found at startup (path = {})", path);
            return;
        }
    };

    let json: Value = match serde_json::from_str(&data) {
        Ok(j) => j,
        Err(e) => {
            tracing::warn!("Failed to parse snapshot JSON: {e}");
            return;
        }
    };

    let obj = match json.as_object() {
        Some(m) => m,
        None => {
            tracing::warn!("Snapshot is not a JSON object, ignoring");
            return;
        }
    };

    let now = Utc::now().timestamp();
    let mut entries = InnerMap::new();

    for (k, v) in obj {
        // { "value": "...", "created_at": 123456789 }
        if let Some(entry_obj) = v.as_object() {
            let value = entry_obj
                .get("value")
                .and_then(|vv| vv.as_str())
                .unwrap_or("")
                .to_string();

            let created_at = entry_obj
                .get("created_at")
                .and_then(|vv| vv.as_i64())
                .unwrap_or(now);

            entries.insert(k.clone(), Entry { value, created_at });
        }
        // Bare "value-as-string" (no metadata)
        else if let Some(s) = v.as_str() {
            entries.insert(
                k.clone(),
                Entry {
                    value: s.to_string(),
                    created_at: now,
                },
            );
        }
    }

    let loaded = entries.len();
    match store.replace(entries) {
        Ok(()) => tracing::info!("Loaded snapshot: {} entries", loaded),
        Err(e) => tracing::warn!("Failed to load snapshot into store: {e}"),
    }
}

/// Save the current store content to `path`.
pub async fn save_snapshot(path: &str, store: &MemoryStore) {
    let entries = match store.entries() {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read store for snapshot: {e}");
            return;
        }
    };

    let mut obj = Map::new();
    for (k, entry) in entries {
        obj.insert(
            k,
            serde_json::json!({
                "value": entry.value,
                "created_at": entry.created_at,
            }),
        );
    }

    let json = match serde_json::to_string_pretty(&Value::Object(obj)) {
        Ok(j) => j,
        Err(e) => {
            tracing::warn!("Failed to serialize snapshot JSON: {e}");
            return;
        }
    };

    match fs::File::create(path) {
        Ok(mut file) => {
            if let Err(e) = file.write_all(json.as_bytes()) {
                tracing::warn!("Failed to write snapshot file: {e}");
            } else {
                tracing::debug!("Snapshot saved");
            }
        }
        Err(e) => tracing::warn!("Failed to create snapshot file: {e}"),
    }
}

/// Background task that periodically saves the snapshot.
pub async fn autosave_loop(path: String, store: MemoryStore, every_sec: u64) {
    loop {
        sleep(Duration::from_secs(every_sec.max(1))).await;
        save_snapshot(&path, &store).await;
    }
}
