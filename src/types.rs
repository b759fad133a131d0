//! Typed views of the Bot API update stream.
//!
//! Decoding works on `serde_json::Value` rather than derived structs so that
//! required fields can be checked one by one and optional fields of the wrong
//! shape are tolerated instead of failing the whole record.

use serde_json::Value;

use crate::error::DecodeError;

/// A chat message embedded in an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message_id: i64,
    pub chat_id: i64,
    /// `None` when the sender has no username.
    pub from_username: Option<String>,
    /// Empty for non-text messages.
    pub text: String,
}

/// One event of the inbound stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub update_id: i64,
    /// `None` for non-message events (edited messages, callbacks, ...).
    pub message: Option<Message>,
}

fn required_i64(value: &Value, pointer: &str, field: &'static str) -> Result<i64, DecodeError> {
    let v = value
        .pointer(pointer)
        .ok_or(DecodeError::MissingField(field))?;
    v.as_i64().ok_or(DecodeError::InvalidType {
        field,
        expected: "an integer",
    })
}

impl Message {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let message_id = required_i64(value, "/message_id", "message_id")?;
        let chat_id = required_i64(value, "/chat/id", "chat.id")?;

        let from_username = value
            .pointer("/from/username")
            .and_then(Value::as_str)
            .map(str::to_string);

        let text = value
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            message_id,
            chat_id,
            from_username,
            text,
        })
    }
}

impl Update {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let update_id = required_i64(value, "/update_id", "update_id")?;

        let message = match value.get("message") {
            Some(m) if !m.is_null() => Some(Message::from_json(m)?),
            _ => None,
        };

        Ok(Self { update_id, message })
    }

    /// Decode the `result` of a `getUpdates` call.
    ///
    /// Fails only if the batch itself is not an array; each record keeps its
    /// own decode result, in the order the server returned them.
    pub fn decode_batch(result: &Value) -> Result<Vec<Result<Self, DecodeError>>, DecodeError> {
        let records = result.as_array().ok_or(DecodeError::NotAnArray)?;
        Ok(records.iter().map(Self::from_json).collect())
    }
}

/// Best-effort `update_id` of a record that failed to decode.
pub fn raw_update_id(value: &Value) -> Option<i64> {
    value.get("update_id").and_then(Value::as_i64)
}
