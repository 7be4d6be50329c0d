//! JSON format handler

use serde_json::Value;

use super::{with_trailing_newline, ConfigFormat, ConfigObject, FormatError, FormatResult};

const NAME: &str = "json";

/// JSON documents, two-space indented
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormat;

impl ConfigFormat for JsonFormat {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn parse(&self, content: &str) -> FormatResult<ConfigObject> {
        if content.trim().is_empty() {
            return Ok(ConfigObject::new());
        }

        let value: Value = serde_json::from_str(content).map_err(|e| FormatError::Parse {
            format: NAME,
            message: e.to_string(),
        })?;

        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(ConfigObject::new()),
            other => Err(FormatError::InvalidFormat {
                format: NAME,
                message: format!("expected an object at the top level, found {}", kind(&other)),
            }),
        }
    }

    fn serialize(&self, obj: &ConfigObject) -> FormatResult<String> {
        let text = serde_json::to_string_pretty(obj).map_err(|e| FormatError::Serialize {
            format: NAME,
            message: e.to_string(),
        })?;
        Ok(with_trailing_newline(text))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_empty_and_null() {
        assert!(JsonFormat.parse("").unwrap().is_empty());
        assert!(JsonFormat.parse("  \n\t").unwrap().is_empty());
        assert!(JsonFormat.parse("null").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            JsonFormat.parse("[1, 2]"),
            Err(FormatError::InvalidFormat { .. })
        ));
        assert!(matches!(
            JsonFormat.parse("42"),
            Err(FormatError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_parse_malformed() {
        let Err(FormatError::Parse { message, .. }) = JsonFormat.parse("{\"a\": ") else {
            panic!("expected parse error");
        };
        assert!(!message.is_empty());
    }

    #[test]
    fn test_serialize_layout() {
        let doc = JsonFormat
            .parse(r#"{"mcpServers":{"poe":{"command":"node","args":["server.js"]}}}"#)
            .unwrap();
        let text = JsonFormat.serialize(&doc).unwrap();
        assert_eq!(
            text,
            "{\n  \"mcpServers\": {\n    \"poe\": {\n      \"command\": \"node\",\n      \"args\": [\n        \"server.js\"\n      ]\n    }\n  }\n}\n"
        );
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(JsonFormat.serialize(&ConfigObject::new()).unwrap(), "{}\n");
    }

    #[test]
    fn test_round_trip() {
        let value = json!({"s": "x", "n": 1.5, "i": -3, "b": false, "z": null, "a": [1, "two", {"k": []}]});
        let Value::Object(doc) = value else { unreachable!() };
        let text = JsonFormat.serialize(&doc).unwrap();
        assert_eq!(JsonFormat.parse(&text).unwrap(), doc);
    }
}
