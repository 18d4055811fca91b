use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Error;

/// A decoded response body.
#[derive(Debug)]
pub(super) struct Envelope<T> {
    pub data: T,
    pub message: Option<String>,
}

/// Decode a successful response body.
///
/// The payload is taken from `data` when the body is an object carrying that
/// key; otherwise the whole body is the payload. An empty body decodes as
/// JSON `null`.
pub(super) fn decode<T: DeserializeOwned>(
    body: &[u8],
    operation: &str,
) -> Result<Envelope<T>, Error> {
    let value = parse(body)
        .map_err(|e| Error::malformed(format!("{operation}: response is not JSON ({e})")))?;

    let message = take_message(&value);
    let payload = match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };

    let data = serde_json::from_value(payload)
        .map_err(|e| Error::malformed(format!("{operation}: unexpected response ({e})")))?;

    Ok(Envelope { data, message })
}

/// The server's message from an error body, if it has one.
pub(super) fn error_message(body: &[u8]) -> Option<String> {
    parse(body).ok().as_ref().and_then(take_message)
}

fn parse(body: &[u8]) -> serde_json::Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        Ok(Value::Null)
    } else {
        serde_json::from_slice(body)
    }
}

fn take_message(value: &Value) -> Option<String> {
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn unwraps_data() {
        let envelope: Envelope<Vec<Item>> =
            decode(br#"{"data": [{"id": 1}], "message": "ok"}"#, "Failed to fetch").unwrap();
        assert_eq!(envelope.data, [Item { id: 1 }]);
        assert_eq!(envelope.message.as_deref(), Some("ok"));
    }

    #[test]
    fn accepts_bare_payload() {
        let envelope: Envelope<Item> = decode(br#"{"id": 7}"#, "Failed to fetch").unwrap();
        assert_eq!(envelope.data, Item { id: 7 });
        assert_eq!(envelope.message, None);
    }

    #[test]
    fn empty_body_is_null() {
        let envelope: Envelope<Option<Item>> = decode(b"", "Failed to delete").unwrap();
        assert_eq!(envelope.data, None);
    }

    #[test]
    fn non_json_is_malformed() {
        let error = decode::<Item>(b"<html>", "Failed to fetch disaster").unwrap_err();
        assert!(matches!(error, Error::Malformed { .. }));
        assert!(error.to_string().starts_with("Failed to fetch disaster"));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let error = decode::<Item>(br#"{"data": {"name": "x"}}"#, "Failed to fetch").unwrap_err();
        assert!(matches!(error, Error::Malformed { .. }));
    }

    #[test]
    fn reads_error_message() {
        assert_eq!(
            error_message(br#"{"message": "Disaster not found"}"#).as_deref(),
            Some("Disaster not found")
        );
        assert_eq!(error_message(br#"{"message": "  "}"#), None);
        assert_eq!(error_message(b"Internal Server Error"), None);
    }
}
