//! Projection of arbitrary CVE metadata onto flat vector-store metadata.
//!
//! Vector stores only accept strings, numbers, booleans and lists of strings
//! as metadata values. Anything else is either reduced to a string list or
//! dropped; sanitization never fails.

use serde_json::{Map, Value};

use crate::models::{MetadataValue, SanitizedMetadata, SanitizerConfig};

#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    config: SanitizerConfig,
}

impl Sanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    pub fn sanitize(&self, metadata: &Map<String, Value>) -> SanitizedMetadata {
        let mut sanitized = SanitizedMetadata::new();

        for (key, value) in metadata {
            if self.config.excluded_fields.contains(key) {
                continue;
            }

            match value {
                Value::Null | Value::Object(_) => {}
                Value::String(s) => {
                    sanitized.insert(key.clone(), MetadataValue::String(s.clone()));
                }
                Value::Number(n) => {
                    sanitized.insert(key.clone(), MetadataValue::Number(n.clone()));
                }
                Value::Bool(b) => {
                    sanitized.insert(key.clone(), MetadataValue::Bool(*b));
                }
                Value::Array(items) => {
                    if let Some((list_key, list)) = self.sanitize_list(key, items) {
                        sanitized.insert(list_key, MetadataValue::StringList(list));
                    }
                }
            }
        }

        sanitized
    }

    fn sanitize_list(&self, key: &str, items: &[Value]) -> Option<(String, Vec<String>)> {
        if items.is_empty() {
            return None;
        }

        if items.iter().all(Value::is_string) {
            let strings = items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();
            return Some((key.to_string(), strings));
        }

        if items.iter().all(Value::is_object) {
            let reduced: Vec<String> = items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(reduce_object)
                .take(self.config.max_list_items)
                .collect();
            if reduced.is_empty() {
                return None;
            }
            return Some((format!("{}{}", key, self.config.derived_suffix), reduced));
        }

        None
    }
}

/// Picks `id`, then `name`, then `vendor:product`.
fn reduce_object(object: &Map<String, Value>) -> Option<String> {
    if let Some(id) = object.get("id").filter(|v| !v.is_null()) {
        return Some(value_to_string(id));
    }
    if let Some(name) = object.get("name").filter(|v| !v.is_null()) {
        return Some(value_to_string(name));
    }
    match (object.get("vendor"), object.get("product")) {
        (Some(vendor), Some(product)) if !vendor.is_null() && !product.is_null() => Some(format!(
            "{}:{}",
            value_to_string(vendor),
            value_to_string(product)
        )),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sanitize(value: Value) -> SanitizedMetadata {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        Sanitizer::default().sanitize(&map)
    }

    /// Checks the serialized form: only scalars and non-empty string lists.
    fn assert_flat(metadata: &SanitizedMetadata) {
        let Value::Object(map) = serde_json::to_value(metadata).unwrap() else {
            panic!("metadata did not serialize to an object");
        };
        for (key, value) in &map {
            match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {}
                Value::Array(items) => {
                    assert!(!items.is_empty(), "empty list under {key}");
                    assert!(
                        items.iter().all(Value::is_string),
                        "non-string list under {key}"
                    );
                }
                Value::Null => panic!("null under {key}"),
                Value::Object(_) => panic!("nested object under {key}"),
            }
        }
    }

    #[test]
    fn test_scalars_pass_through() {
        let out = sanitize(json!({
            "severity": "CRITICAL",
            "cvss": 9.8,
            "year": 2021,
            "kev": false,
        }));

        assert_eq!(out.get("severity"), Some(&MetadataValue::from("CRITICAL")));
        assert_eq!(out.get("kev"), Some(&MetadataValue::Bool(false)));
        assert!(matches!(out.get("cvss"), Some(MetadataValue::Number(n)) if n.as_f64() == Some(9.8)));
        assert!(matches!(out.get("year"), Some(MetadataValue::Number(n)) if n.as_i64() == Some(2021)));
    }

    #[test]
    fn test_nulls_objects_and_empty_lists_dropped() {
        let out = sanitize(json!({
            "published": null,
            "cvssV3": {"baseScore": 7.5},
            "references": [],
            "kept": "yes",
        }));

        assert_eq!(out.len(), 1);
        assert!(out.contains_key("kept"));
    }

    #[test]
    fn test_excluded_fields_never_appear() {
        let out = sanitize(json!({
            "exploits": [{"id": "EDB-1"}],
            "metasploitModules": "exploit/linux/http/foo",
            "affectedProducts": [{"vendor": "acme", "product": "router"}],
            "description": "buffer overflow",
        }));

        assert_eq!(out.len(), 1);
        for key in out.keys() {
            assert!(!key.starts_with("exploits"));
            assert!(!key.starts_with("metasploitModules"));
            assert!(!key.starts_with("affectedProducts"));
        }
    }

    #[test]
    fn test_string_list_kept_under_original_key() {
        let out = sanitize(json!({"cwe": ["CWE-79", "CWE-89"]}));
        assert_eq!(
            out.get("cwe"),
            Some(&MetadataValue::from(vec![
                "CWE-79".to_string(),
                "CWE-89".to_string()
            ]))
        );
    }

    #[test]
    fn test_object_list_reduced_by_priority() {
        let out = sanitize(json!({
            "products": [
                {"id": "p-1", "name": "ignored"},
                {"name": "openssl"},
                {"vendor": "acme", "product": "router"},
                {"version": "1.0"},
            ]
        }));

        assert!(!out.contains_key("products"));
        assert_eq!(
            out.get("products_list"),
            Some(&MetadataValue::from(vec![
                "p-1".to_string(),
                "openssl".to_string(),
                "acme:router".to_string(),
            ]))
        );
    }

    #[test]
    fn test_object_list_capped_at_fifty() {
        let items: Vec<Value> = (0..75).map(|i| json!({"id": format!("ref-{i}")})).collect();
        let out = sanitize(json!({"references": items}));

        let Some(MetadataValue::StringList(list)) = out.get("references_list") else {
            panic!("expected reduced list");
        };
        assert_eq!(list.len(), 50);
        assert_eq!(list[0], "ref-0");
        assert_eq!(list[49], "ref-49");
    }

    #[test]
    fn test_numeric_id_uses_json_text() {
        let out = sanitize(json!({"advisories": [{"id": 42}]}));
        assert_eq!(
            out.get("advisories_list"),
            Some(&MetadataValue::from(vec!["42".to_string()]))
        );
    }

    #[test]
    fn test_null_id_falls_through_to_name() {
        let out = sanitize(json!({
            "weaknesses": [
                {"id": null, "name": "Improper Input Validation"},
                {"id": null, "name": null, "vendor": "acme", "product": "router"},
                {"id": null},
                {"id": "CWE-787"},
            ]
        }));
        assert_eq!(
            out.get("weaknesses_list"),
            Some(&MetadataValue::from(vec![
                "Improper Input Validation".to_string(),
                "acme:router".to_string(),
                "CWE-787".to_string(),
            ]))
        );
        assert_flat(&out);
    }

    #[test]
    fn test_unreducible_object_list_dropped() {
        let out = sanitize(json!({"weird": [{"foo": 1}, {"bar": 2}]}));
        assert!(out.is_empty());
    }

    #[test]
    fn test_mixed_lists_dropped() {
        let out = sanitize(json!({
            "mixed": ["a", {"id": "b"}],
            "numbers": [1, 2, 3],
            "with_null": ["a", null],
        }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_custom_config() {
        let config = SanitizerConfig {
            excluded_fields: ["description".to_string()].into_iter().collect(),
            derived_suffix: "_ids".to_string(),
            max_list_items: 2,
        };
        let Value::Object(map) = json!({
            "description": "dropped",
            "exploits": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
        }) else {
            unreachable!()
        };

        let out = Sanitizer::new(config).sanitize(&map);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out.get("exploits_ids"),
            Some(&MetadataValue::from(vec!["a".to_string(), "b".to_string()]))
        );
    }

    #[test]
    fn test_output_is_always_flat() {
        let out = sanitize(json!({
            "a": null,
            "b": {"nested": {"deep": true}},
            "c": [],
            "d": [{"nothing": 1}],
            "e": [1, "x"],
            "f": ["ok"],
            "g": [{"name": "n"}],
            "h": 1,
        }));

        assert_flat(&out);
        assert_eq!(
            out.keys().cloned().collect::<Vec<_>>(),
            vec!["f".to_string(), "g_list".to_string(), "h".to_string()]
        );
    }
}
