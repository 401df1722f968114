//! Normalization of per-step image attachment lists.

use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::flow::ImageRef;

/// Filters and completes image entries so a malformed attachment never reaches a step.
///
/// - entries that are not objects are dropped
/// - entries without a usable `url` are dropped, unless a URL base is
///   configured and the entry names a `fileName`, in which case the URL is
///   built from the two
/// - a missing `fileName` is derived from the last path segment of `url`
/// - every other key is passed through unchanged
///
/// Running the validator on its own output is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageValidator {
    url_base: Option<String>,
}

impl ImageValidator {
    pub fn new() -> Self {
        Self { url_base: None }
    }

    /// Synthesize `url = <base>/<fileName>` for entries that only name a file.
    pub fn with_url_base(mut self, base: impl Into<String>) -> Self {
        self.url_base = Some(base.into());
        self
    }

    /// Cleans a raw (untrusted) images list.
    pub fn clean(&self, entries: &[JsonValue]) -> Vec<ImageRef> {
        entries
            .iter()
            .filter_map(|entry| match entry {
                JsonValue::Object(map) => self.clean_entry(map),
                other => {
                    warn!(entry = %other, "dropping non-object image entry");
                    None
                }
            })
            .collect()
    }

    /// Cleans an already typed list.
    pub fn clean_refs(&self, images: Vec<ImageRef>) -> Vec<ImageRef> {
        images
            .into_iter()
            .filter_map(|image| {
                let ImageRef {
                    url,
                    file_name,
                    extra,
                } = image;
                self.complete(url, file_name, extra)
            })
            .collect()
    }

    fn clean_entry(&self, map: &Map<String, JsonValue>) -> Option<ImageRef> {
        let text = |key: &str| {
            map.get(key)
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };
        let extra = map
            .iter()
            .filter(|(key, _)| key.as_str() != "url" && key.as_str() != "fileName")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        self.complete(text("url"), text("fileName"), extra)
    }

    fn complete(
        &self,
        url: String,
        file_name: String,
        extra: Map<String, JsonValue>,
    ) -> Option<ImageRef> {
        let url = if !url.trim().is_empty() {
            url
        } else if let Some(base) = &self.url_base
            && !file_name.trim().is_empty()
        {
            format!("{}/{}", base.trim_end_matches('/'), file_name)
        } else {
            warn!(file_name = %file_name, "dropping image entry without url");
            return None;
        };

        let file_name = if file_name.trim().is_empty() {
            file_name_from_url(&url).to_string()
        } else {
            file_name
        };

        Some(ImageRef {
            url,
            file_name,
            extra,
        })
    }
}

/// Final non-empty path segment of `url` (split on `/` or `\`); `url` itself
/// when it has none. Trailing separators are skipped, so `https://host/dir/`
/// yields `dir`.
pub fn file_name_from_url(url: &str) -> &str {
    url.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_drops_malformed_entries() {
        let entries = vec![
            json!("just-a-string"),
            json!(42),
            json!({"fileName": "a.png"}),
            json!({"url": ""}),
            json!({"url": "/api/images/emergency-flows/b.png"}),
        ];
        let cleaned = ImageValidator::new().clean(&entries);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].file_name, "b.png");
    }

    #[test]
    fn test_file_name_derivation() {
        assert_eq!(file_name_from_url("/images/x/y.jpg"), "y.jpg");
        assert_eq!(file_name_from_url("C:\\img\\z.png"), "z.png");
        assert_eq!(file_name_from_url("plain.png"), "plain.png");
        assert_eq!(file_name_from_url("https://host/dir/"), "dir");
    }

    #[test]
    fn test_existing_file_name_and_extra_keys_are_kept() {
        let entries = vec![json!({"url": "/a/b.png", "fileName": "custom.png", "caption": "c"})];
        let cleaned = ImageValidator::new().clean(&entries);
        assert_eq!(cleaned[0].file_name, "custom.png");
        assert_eq!(cleaned[0].extra["caption"], "c");
    }

    #[test]
    fn test_url_base_synthesizes_url() {
        let validator = ImageValidator::new().with_url_base("/api/images/emergency-flows/");
        let cleaned = validator.clean(&[json!({"fileName": "step1.jpg"})]);
        assert_eq!(cleaned[0].url, "/api/images/emergency-flows/step1.jpg");
    }

    #[test]
    fn test_validator_is_idempotent() {
        let validator = ImageValidator::new();
        let entries = vec![
            json!({"url": "/a/one.png"}),
            json!(null),
            json!({"url": "two.png", "fileName": ""}),
        ];
        let once = validator.clean(&entries);
        let twice = validator.clean_refs(once.clone());
        assert_eq!(once, twice);

        let reserialized: Vec<JsonValue> =
            once.iter().map(|i| serde_json::to_value(i).unwrap()).collect();
        assert_eq!(validator.clean(&reserialized), once);
    }
}
