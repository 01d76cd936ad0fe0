//! Storage REST API types

use serde::Deserialize;

/// Object metadata as returned by the storage REST API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub name: String,
    pub bucket: String,
    pub content_type: Option<String>,
    /// Sent as a decimal string
    pub size: Option<String>,
    /// Comma-separated access tokens
    #[serde(default)]
    pub download_tokens: Option<String>,
}

impl ObjectMetadata {
    pub fn first_token(&self) -> Option<&str> {
        self.download_tokens
            .as_deref()?
            .split(',')
            .map(str::trim)
            .find(|token| !token.is_empty())
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref()?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_deserialization() {
        let json = r#"{
            "name": "animals/42/cat.jpg",
            "bucket": "pawmatch.appspot.com",
            "generation": "1712345678901234",
            "contentType": "image/jpeg",
            "size": "48213",
            "downloadTokens": "3f1c2d9e-aaaa,7b7b-bbbb"
        }"#;

        let meta: ObjectMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.name, "animals/42/cat.jpg");
        assert_eq!(meta.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(meta.size_bytes(), Some(48213));
        assert_eq!(meta.first_token(), Some("3f1c2d9e-aaaa"));
    }

    #[test]
    fn test_metadata_without_tokens() {
        let json = r#"{"name": "private.jpg", "bucket": "pawmatch.appspot.com"}"#;

        let meta: ObjectMetadata = serde_json::from_str(json).unwrap();
        assert!(meta.first_token().is_none());
        assert!(meta.size_bytes().is_none());

        let blank: ObjectMetadata = serde_json::from_str(
            r#"{"name": "x.jpg", "bucket": "b", "downloadTokens": " , "}"#,
        )
        .unwrap();
        assert!(blank.first_token().is_none());
    }
}
