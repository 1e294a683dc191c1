//! Graph schema registry for Tessera (trusted lookups for ingestion).
//!
//! Ingestion adapters build candidate graph records without knowing the
//! domain model. This crate is the capability they are handed instead of
//! ambient global state:
//!
//! - which entity and relationship types exist,
//! - how each attribute is typed (`string` / `numeric` / `date`, single or
//!   multi-valued),
//! - which attributes are references to other records and how those render
//!   on the wire,
//! - per-type derived ("inner") properties stamped on every record,
//! - deterministic, content-derived record identifiers, and
//! - conversion of finalized store records into interchange objects.
//!
//! The built-in registry covers the threat-intelligence model the bundled
//! mappers target. Tests inject their own [`SchemaRegistry`] impls where a
//! smaller surface is enough.

pub mod ident;
pub mod registry;
pub mod wire;

pub use ident::{bundle_id, deterministic_id};
pub use registry::{
    AttrKind, AttributeDefinition, BuiltinSchema, EntityTypeDef, RefShape, RelationRefDefinition,
    RelationshipTypeDef, SchemaRegistry,
};
pub use wire::to_wire;

use serde_json::Value;

// ============================================================================
// Reserved record keys
// ============================================================================

/// Concrete graph type of a record, entity and relationship alike.
pub const ATTR_ENTITY_TYPE: &str = "entity_type";
/// Relationship type, stamped on relationship records only.
pub const ATTR_RELATIONSHIP_TYPE: &str = "relationship_type";
/// Deterministic content-derived identifier.
pub const ATTR_STANDARD_ID: &str = "standard_id";
/// Relationship source endpoint (the resolved record itself).
pub const ATTR_FROM: &str = "from";
/// Relationship target endpoint (the resolved record itself).
pub const ATTR_TO: &str = "to";
/// Graph type of the source endpoint.
pub const ATTR_FROM_TYPE: &str = "from_type";
/// Graph type of the target endpoint.
pub const ATTR_TO_TYPE: &str = "to_type";

/// Keys that carry record plumbing rather than mapped attribute values.
pub const RESERVED_KEYS: &[&str] = &[
    ATTR_ENTITY_TYPE,
    ATTR_RELATIONSHIP_TYPE,
    ATTR_STANDARD_ID,
    ATTR_FROM,
    ATTR_TO,
    ATTR_FROM_TYPE,
    ATTR_TO_TYPE,
];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Emptiness as the mapping pipeline sees it: null, blank strings, and empty
/// collections all count as "no value".
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_value_covers_blank_strings_and_collections() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!("   ")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
        assert!(!is_empty_value(&json!("x")));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(["a"])));
    }

    #[test]
    fn reserved_keys_include_endpoints() {
        assert!(is_reserved_key(ATTR_FROM));
        assert!(is_reserved_key(ATTR_TO));
        assert!(!is_reserved_key("name"));
    }
}
