//! Attribute maps and the attribute set produced by providers.
//!
//! OTLP carries attributes as `Vec<KeyValue>`. Keys are unique by
//! convention, so the helpers here treat the vector as a map: reads return
//! the first entry for a key and writes replace that entry in place.

use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};

/// Returns the value stored under `key`, if any.
pub fn get<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a any_value::Value> {
    attributes
        .iter()
        .find(|kv| kv.key == key)
        .and_then(|kv| kv.value.as_ref())
        .and_then(|v| v.value.as_ref())
}

/// Returns the string value stored under `key`. Non-string values yield `None`.
pub fn get_str<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a str> {
    match get(attributes, key) {
        Some(any_value::Value::StringValue(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// Inserts `kv`, replacing the value of an existing entry with the same key.
pub fn upsert(attributes: &mut Vec<KeyValue>, kv: KeyValue) {
    match attributes.iter_mut().find(|existing| existing.key == kv.key) {
        Some(existing) => existing.value = kv.value,
        None => attributes.push(kv),
    }
}

/// An immutable set of typed attributes, unique by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    entries: Vec<KeyValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an integer attribute.
    pub fn with_int(mut self, key: &str, value: i64) -> Self {
        upsert(
            &mut self.entries,
            key_value(key, any_value::Value::IntValue(value)),
        );
        self
    }

    /// Adds a string attribute.
    pub fn with_string(mut self, key: &str, value: impl Into<String>) -> Self {
        upsert(
            &mut self.entries,
            key_value(key, any_value::Value::StringValue(value.into())),
        );
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&any_value::Value> {
        get(&self.entries, key)
    }

    /// Merges every entry into `attributes`. Existing keys are overwritten,
    /// unrelated keys are left alone.
    pub fn merge_into(&self, attributes: &mut Vec<KeyValue>) {
        for kv in &self.entries {
            upsert(attributes, kv.clone());
        }
    }
}

fn key_value(key: &str, value: any_value::Value) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue { value: Some(value) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_kv(key: &str, value: &str) -> KeyValue {
        key_value(key, any_value::Value::StringValue(value.to_string()))
    }

    #[test]
    fn get_str_ignores_other_value_types() {
        let attrs = vec![
            key_value("port", any_value::Value::IntValue(443)),
            string_kv("host", "example.com"),
        ];
        assert_eq!(get_str(&attrs, "host"), Some("example.com"));
        assert_eq!(get_str(&attrs, "port"), None);
        assert_eq!(get_str(&attrs, "missing"), None);
    }

    #[test]
    fn merge_overwrites_and_keeps_unrelated_keys() {
        let mut attrs = vec![string_kv("as.number", "stale"), string_kv("keep", "me")];

        AttributeSet::new()
            .with_int("as.number", 13337)
            .with_string("as.organization.name", "CLOUDFLARENET")
            .merge_into(&mut attrs);

        assert_eq!(attrs.len(), 3);
        assert_eq!(
            get(&attrs, "as.number"),
            Some(&any_value::Value::IntValue(13337))
        );
        assert_eq!(get_str(&attrs, "as.organization.name"), Some("CLOUDFLARENET"));
        assert_eq!(get_str(&attrs, "keep"), Some("me"));
    }

    #[test]
    fn set_keys_are_unique() {
        let set = AttributeSet::new().with_int("a", 1).with_int("a", 2);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a"), Some(&any_value::Value::IntValue(2)));
    }
}
