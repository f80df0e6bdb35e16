//! Output Fingerprints
//!
//! A report's `outputHash` identifies the validated value together with the
//! schema revision that produced it, so the same output under a different
//! schema version never shares a fingerprint.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::schema::Schema;

/// SHA-256 over `schema id`, `schema version` and the serialized output.
///
/// serde_json's `Map` is ordered by key unless `preserve_order` is enabled,
/// which this crate never turns on, so serialization is already canonical.
pub fn compute_output_hash(schema: &Schema, output: &Value) -> Result<String, serde_json::Error> {
    let body = serde_json::to_vec(output)?;
    let mut hasher = Sha256::new();
    for part in [schema.id.as_bytes(), schema.schema_version.as_bytes(), body.as_slice()] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(id: &str, version: &str) -> Schema {
        serde_json::from_value(json!({
            "id": id,
            "name": id,
            "schemaVersion": version,
            "engineMinVersion": "1.0.0"
        }))
        .unwrap()
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let signup = schema("signup", "1.0.0");
        let h1 = compute_output_hash(&signup, &json!({"name": "Ann", "tags": ["a", "b"]})).unwrap();
        let h2 = compute_output_hash(&signup, &json!({"tags": ["a", "b"], "name": "Ann"})).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        let h3 = compute_output_hash(&signup, &json!({"tags": ["b", "a"], "name": "Ann"})).unwrap();
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_schema_revision_is_part_of_the_hash() {
        let output = json!({"age": 30});
        let v1 = compute_output_hash(&schema("signup", "1.0.0"), &output).unwrap();
        let v2 = compute_output_hash(&schema("signup", "1.1.0"), &output).unwrap();
        let other = compute_output_hash(&schema("profile", "1.0.0"), &output).unwrap();
        assert_ne!(v1, v2);
        assert_ne!(v1, other);
    }

    #[test]
    fn test_fields_cannot_run_together() {
        let output = json!(null);
        let a = compute_output_hash(&schema("ab", "1.0.0"), &output).unwrap();
        let b = compute_output_hash(&schema("a", "b1.0.0"), &output).unwrap();
        assert_ne!(a, b);
    }
}
