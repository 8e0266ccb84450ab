//! Metadata document parsing and merge.

use pinforge_core::{MetadataDefaults, UploadError};
use serde_json::{Map, Value};

/// Open key/value record describing an uploaded asset.
pub type MetadataDocument = Map<String, Value>;

/// Filename that marks a part as the metadata sidecar.
pub const METADATA_FILE_NAME: &str = "metadata.json";

pub const METADATA_MEDIA_TYPE: &str = "application/json";

/// Parse a sidecar payload. Anything other than a JSON object is rejected.
pub fn parse_metadata(payload: &[u8]) -> Result<MetadataDocument, UploadError> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(UploadError::InvalidMetadataInput(format!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
        Err(e) => Err(UploadError::InvalidMetadataInput(e.to_string())),
    }
}

/// Point `image` at the uploaded asset and fill `name` / `description`
/// when they are missing or empty. Every other key is left as supplied.
pub fn merge_metadata(
    mut doc: MetadataDocument,
    image_url: &str,
    defaults: &MetadataDefaults,
) -> MetadataDocument {
    doc.insert("image".to_string(), Value::String(image_url.to_string()));
    fill_if_blank(&mut doc, "name", &defaults.name);
    fill_if_blank(&mut doc, "description", &defaults.description);
    doc
}

fn fill_if_blank(doc: &mut MetadataDocument, key: &str, default: &str) {
    let blank = match doc.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    };
    if blank {
        doc.insert(key.to_string(), Value::String(default.to_string()));
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> MetadataDefaults {
        MetadataDefaults {
            name: "Untitled".into(),
            description: "Uploaded via pinforge".into(),
        }
    }

    #[test]
    fn empty_document_gets_exactly_three_keys() {
        let doc = merge_metadata(Map::new(), "ipfs://bafyimg", &defaults());
        assert_eq!(
            Value::Object(doc),
            json!({"name": "Untitled", "description": "Uploaded via pinforge", "image": "ipfs://bafyimg"})
        );
    }

    #[test]
    fn keeps_supplied_name_and_fills_description() {
        let doc = parse_metadata(br#"{"name": "X"}"#).unwrap();
        let doc = merge_metadata(doc, "ipfs://bafyimg", &defaults());
        assert_eq!(doc["name"], "X");
        assert_eq!(doc["description"], "Uploaded via pinforge");
    }

    #[test]
    fn image_is_always_overwritten() {
        let doc = parse_metadata(br#"{"image": "https://elsewhere/cat.png"}"#).unwrap();
        let doc = merge_metadata(doc, "ipfs://bafyimg", &defaults());
        assert_eq!(doc["image"], "ipfs://bafyimg");
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let doc = parse_metadata(br#"{"name": "", "description": null}"#).unwrap();
        let doc = merge_metadata(doc, "ipfs://bafyimg", &defaults());
        assert_eq!(doc["name"], "Untitled");
        assert_eq!(doc["description"], "Uploaded via pinforge");
    }

    #[test]
    fn other_keys_are_preserved() {
        let doc = parse_metadata(
            br#"{"attributes": [{"trait_type": "eyes", "value": "green"}], "external_url": "https://x"}"#,
        )
        .unwrap();
        let doc = merge_metadata(doc, "ipfs://bafyimg", &defaults());
        assert_eq!(doc["attributes"], json!([{"trait_type": "eyes", "value": "green"}]));
        assert_eq!(doc["external_url"], "https://x");
    }

    #[test]
    fn rejects_invalid_json() {
        let err = parse_metadata(b"{not json").unwrap_err();
        assert!(matches!(err, UploadError::InvalidMetadataInput(_)));
    }

    #[test]
    fn rejects_non_object_json() {
        let err = parse_metadata(b"[1, 2]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "metadata.json is not a valid JSON object: expected a JSON object, got array"
        );
    }
}
