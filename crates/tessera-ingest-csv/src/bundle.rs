//! Bundle accumulation.
//!
//! One builder per run. Objects are appended as rows are processed;
//! `build` snapshots the current state, de-duplicated by object id with the
//! first occurrence kept. Deterministic record ids make that dedup collapse
//! semantically identical records produced from different rows.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use tessera_schema::bundle_id;

pub const BUNDLE_TYPE: &str = "bundle";

/// The sole externally visible artifact of an ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct Bundle {
    pub id: String,
    #[serde(rename = "type")]
    pub bundle_type: String,
    pub objects: Vec<Value>,
}

#[derive(Debug)]
pub struct BundleBuilder {
    id: String,
    objects: Vec<Value>,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self {
            id: bundle_id(),
            objects: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn add_objects(&mut self, objects: Vec<Value>) {
        self.objects.extend(objects);
    }

    /// Snapshot the accumulated objects, unique by id. Idempotent: repeated
    /// calls without intervening `add_objects` return the same bundle.
    pub fn build(&self) -> Bundle {
        let mut seen = HashSet::new();
        let objects = self
            .objects
            .iter()
            .filter(|object| {
                match object.get("id").and_then(Value::as_str) {
                    Some(id) => seen.insert(id.to_string()),
                    // Objects without an id cannot be de-duplicated; keep them.
                    None => true,
                }
            })
            .cloned()
            .collect();
        Bundle {
            id: self.id.clone(),
            bundle_type: BUNDLE_TYPE.to_string(),
            objects,
        }
    }
}

impl Default for BundleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut builder = BundleBuilder::new();
        builder.add_objects(vec![
            json!({ "id": "x--1", "name": "first" }),
            json!({ "id": "x--2", "name": "other" }),
        ]);
        builder.add_objects(vec![json!({ "id": "x--1", "name": "second" })]);

        let bundle = builder.build();
        assert_eq!(bundle.objects.len(), 2);
        assert_eq!(bundle.objects[0]["name"], "first");
    }

    #[test]
    fn build_is_idempotent() {
        let mut builder = BundleBuilder::new();
        builder.add_objects(vec![json!({ "id": "x--1" }), json!({ "id": "x--1" })]);
        let first = builder.build();
        let second = builder.build();
        assert_eq!(first.id, second.id);
        assert_eq!(first.objects, second.objects);
        assert_eq!(first.objects.len(), 1);
    }

    #[test]
    fn serializes_with_type_marker() {
        let builder = BundleBuilder::new();
        let value = serde_json::to_value(builder.build()).unwrap();
        assert_eq!(value["type"], BUNDLE_TYPE);
        assert!(value["id"].as_str().unwrap().starts_with("bundle--"));
        assert_eq!(value["objects"], json!([]));
    }
}
