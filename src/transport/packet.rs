//! Wire frames.
//!
//! Every WebSocket text message carries one JSON frame:
//! - `["/users/4/get", arg...]`: a message with no reply expected
//! - `{"ack": 7, "data": ["/users/4/get", arg...]}`: a message whose
//!   handler may answer with `{"ack": 7, "data": [value...]}`
//!
//! Outbound unsolicited messages use the plain array form with an event
//! name in first position.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("malformed frame: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

/// One JSON frame, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    /// Plain array. Must be tried first: an object never decodes as an array.
    Event(Vec<Value>),
    /// Array wrapped with an acknowledgement id.
    Ack { ack: u64, data: Vec<Value> },
}

impl Frame {
    pub fn encode(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(TransportError::Encode)
    }

    pub fn decode(text: &str) -> Result<Self, TransportError> {
        serde_json::from_str(text).map_err(TransportError::Decode)
    }
}

/// An inbound message: route string, payload arguments and optional ack id.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub data: Vec<Value>,
    pub ack: Option<u64>,
}

impl Packet {
    pub fn decode(text: &str) -> Result<Self, TransportError> {
        Ok(Frame::decode(text)?.into())
    }

    /// The route string, if the first element is a string.
    pub fn route(&self) -> Option<&str> {
        self.data.first().and_then(Value::as_str)
    }

    /// Everything after the first element.
    pub fn args(&self) -> &[Value] {
        self.data.get(1..).unwrap_or_default()
    }
}

impl From<Frame> for Packet {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Event(data) => Packet { data, ack: None },
            Frame::Ack { ack, data } => Packet { data, ack: Some(ack) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_array() {
        let packet = Packet::decode(r#"["/users/4/get", false, {"x": 1}]"#).unwrap();
        assert_eq!(packet.route(), Some("/users/4/get"));
        assert_eq!(packet.args(), [json!(false), json!({"x": 1})]);
        assert_eq!(packet.ack, None);
    }

    #[test]
    fn test_acknowledged_message() {
        let packet = Packet::decode(r#"{"ack": 12, "data": ["/photos/post?crop=true"]}"#).unwrap();
        assert_eq!(packet.route(), Some("/photos/post?crop=true"));
        assert!(packet.args().is_empty());
        assert_eq!(packet.ack, Some(12));
    }

    #[test]
    fn test_non_string_route() {
        let packet = Packet::decode("[42, \"x\"]").unwrap();
        assert_eq!(packet.route(), None);

        let packet = Packet::decode("[]").unwrap();
        assert_eq!(packet.route(), None);
        assert!(packet.args().is_empty());
    }

    #[test]
    fn test_malformed_frames() {
        assert!(matches!(Packet::decode("not json"), Err(TransportError::Decode(_))));
        assert!(Packet::decode(r#"{"data": []}"#).is_err());
        assert!(Packet::decode(r#""just a string""#).is_err());
    }

    #[test]
    fn test_encode_shapes() {
        let ack = Frame::Ack { ack: 3, data: vec![json!("4")] };
        assert_eq!(ack.encode().unwrap(), r#"{"ack":3,"data":["4"]}"#);

        let event = Frame::Event(vec![json!("tick"), json!(1)]);
        assert_eq!(event.encode().unwrap(), r#"["tick",1]"#);
    }
}
