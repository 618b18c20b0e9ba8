use serde_json::Value;

use super::payload::WebhookField;

/// Field lookup abstraction so the provider's naming quirks stay out of
/// the extraction logic.
pub trait FieldResolver {
    fn value(&self, key: &str) -> Option<&Value>;

    /// Non-empty, trimmed text for `key`.
    fn text(&self, key: &str) -> Option<String> {
        match self.value(key)? {
            Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    /// Unsigned integer for `key`; numeric JSON values and numeric strings
    /// both count since the provider is inconsistent about them.
    fn uint(&self, key: &str) -> Option<u32> {
        match self.value(key)? {
            Value::Number(number) => number.as_u64().and_then(|value| u32::try_from(value).ok()),
            Value::String(raw) => raw.trim().parse::<u32>().ok(),
            _ => None,
        }
    }
}

/// Resolves fields by key prefix: the provider suffixes hidden-field keys,
/// but they still begin with the configured key. An exact match wins over
/// a prefix match.
pub struct PrefixFieldResolver<'a> {
    fields: &'a [WebhookField],
}

impl<'a> PrefixFieldResolver<'a> {
    pub fn new(fields: &'a [WebhookField]) -> Self {
        Self { fields }
    }
}

impl FieldResolver for PrefixFieldResolver<'_> {
    fn value(&self, key: &str) -> Option<&Value> {
        if let Some(field) = self.fields.iter().find(|field| field.key == key) {
            return Some(&field.value);
        }
        self.fields
            .iter()
            .find(|field| field.key.starts_with(key))
            .map(|field| &field.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(key: &str, value: Value) -> WebhookField {
        WebhookField {
            key: key.to_string(),
            field_type: "HIDDEN_FIELDS".to_string(),
            value,
        }
    }

    #[test]
    fn exact_key_wins_over_prefixed_sibling() {
        let fields = vec![
            field("email_backup_a1b2", json!("shadow@example.com")),
            field("email", json!("real@example.com")),
        ];
        let resolver = PrefixFieldResolver::new(&fields);
        assert_eq!(resolver.text("email").as_deref(), Some("real@example.com"));
    }

    #[test]
    fn hidden_suffixed_keys_resolve_by_prefix() {
        let fields = vec![field("score_x9y8z7", json!(85))];
        let resolver = PrefixFieldResolver::new(&fields);
        assert_eq!(resolver.uint("score"), Some(85));
    }

    #[test]
    fn numeric_strings_parse_as_uints() {
        let fields = vec![field("maxScore", json!("100"))];
        let resolver = PrefixFieldResolver::new(&fields);
        assert_eq!(resolver.uint("maxScore"), Some(100));
    }

    #[test]
    fn blank_text_counts_as_absent() {
        let fields = vec![field("phone", json!("   "))];
        let resolver = PrefixFieldResolver::new(&fields);
        assert_eq!(resolver.text("phone"), None);
        assert_eq!(resolver.text("missing"), None);
    }
}
