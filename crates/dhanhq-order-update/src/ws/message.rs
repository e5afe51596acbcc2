/*
[INPUT]:  Credential snapshot, raw WebSocket text frames
[OUTPUT]: Login payload JSON, parsed InboundMessage, Observation values
[POS]:    WebSocket layer - wire message shapes
[UPDATE]: When the login payload or the order alert shape changes
*/

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OrderUpdateError, Result};

/// Message code the feed expects in a login request
pub const LOGIN_MSG_CODE: u16 = 42;
/// User type sent with every login request
pub const USER_TYPE_SELF: &str = "SELF";
/// Discriminator of order state change messages
pub const ORDER_ALERT_TYPE: &str = "order_alert";
/// Status reported when an order alert carries none
pub const UNKNOWN_STATUS: &str = "Unknown status";

/// Login frame sent once right after the connection opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    #[serde(rename = "LoginReq")]
    pub login_req: LoginPayload,
    #[serde(rename = "UserType")]
    pub user_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginPayload {
    #[serde(rename = "MsgCode")]
    pub msg_code: u16,
    #[serde(rename = "ClientId")]
    pub client_id: String,
    #[serde(rename = "Token")]
    pub token: String,
}

impl LoginRequest {
    pub fn new(client_id: &str, access_token: &str) -> Self {
        Self {
            login_req: LoginPayload {
                msg_code: LOGIN_MSG_CODE,
                client_id: client_id.to_string(),
                token: access_token.to_string(),
            },
            user_type: USER_TYPE_SELF,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One decoded frame from the feed.
///
/// Only `Type` and, for order alerts, `Data` are interpreted; everything
/// else is carried through untouched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct InboundMessage(Value);

impl InboundMessage {
    /// Decode a text frame
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str::<Value>(raw)
            .map(Self)
            .map_err(|err| OrderUpdateError::malformed(err, raw.len()))
    }

    /// Value of the `Type` discriminator, if it is a string
    pub fn message_type(&self) -> Option<&str> {
        self.0.get("Type").and_then(Value::as_str)
    }

    pub fn is_order_alert(&self) -> bool {
        self.message_type() == Some(ORDER_ALERT_TYPE)
    }

    /// Nested `Data` payload
    pub fn data(&self) -> Option<&Value> {
        self.0.get("Data")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for InboundMessage {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// What the dispatcher reports for a frame the update handler did not absorb
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// Frame whose type is not an order alert, as received
    Unknown { message: Value },
    /// Order alert carrying an order number
    OrderStatus {
        status: String,
        order_id: String,
        data: Value,
    },
    /// Order alert without an order number
    OrderUpdate { data: Value },
}

impl Observation {
    /// Default presentation of an order alert
    pub fn from_order_alert(message: &InboundMessage) -> Self {
        let data = message
            .data()
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        match data.get("orderNo") {
            Some(order_no) => Observation::OrderStatus {
                status: status_text(data.get("status")),
                order_id: value_text(order_no),
                data,
            },
            None => Observation::OrderUpdate { data },
        }
    }
}

fn status_text(status: Option<&Value>) -> String {
    match status {
        None | Some(Value::Null) => UNKNOWN_STATUS.to_string(),
        Some(value) => value_text(value),
    }
}

/// Strings as-is, anything else (including null) as its JSON text
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_request_wire_format() {
        let login = LoginRequest::new("1100003626", "eyJhbGc...");
        assert_eq!(
            login.to_json().unwrap(),
            r#"{"LoginReq":{"MsgCode":42,"ClientId":"1100003626","Token":"eyJhbGc..."},"UserType":"SELF"}"#
        );
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = InboundMessage::parse("not json").unwrap_err();
        match err {
            OrderUpdateError::MalformedFrame { bytes, .. } => assert_eq!(bytes, 8),
            other => panic!("Expected MalformedFrame, got {other:?}"),
        }
    }

    #[test]
    fn test_message_type_only_reads_strings() {
        let message = InboundMessage::from(json!({"Type": 7}));
        assert_eq!(message.message_type(), None);
        assert!(!message.is_order_alert());

        let message = InboundMessage::parse(r#"[1, 2, 3]"#).unwrap();
        assert_eq!(message.message_type(), None);
    }

    #[test]
    fn test_order_alert_with_order_number() {
        let message = InboundMessage::from(json!({
            "Type": "order_alert",
            "Data": {"orderNo": "112111182045", "status": "TRADED"}
        }));
        assert_eq!(
            Observation::from_order_alert(&message),
            Observation::OrderStatus {
                status: "TRADED".to_string(),
                order_id: "112111182045".to_string(),
                data: json!({"orderNo": "112111182045", "status": "TRADED"}),
            }
        );
    }

    #[test]
    fn test_order_alert_without_data_is_generic_update() {
        let message = InboundMessage::from(json!({"Type": "order_alert"}));
        assert_eq!(
            Observation::from_order_alert(&message),
            Observation::OrderUpdate { data: json!({}) }
        );
    }

    #[test]
    fn test_null_order_number_is_rendered_as_json_text() {
        let message = InboundMessage::from(json!({
            "Type": "order_alert",
            "Data": {"orderNo": null, "status": "PENDING"}
        }));
        match Observation::from_order_alert(&message) {
            Observation::OrderStatus { status, order_id, .. } => {
                assert_eq!(order_id, "null");
                assert_eq!(status, "PENDING");
            }
            other => panic!("Expected OrderStatus, got {other:?}"),
        }
    }

    #[test]
    fn test_numeric_order_number_is_rendered_as_text() {
        let message = InboundMessage::from(json!({
            "Type": "order_alert",
            "Data": {"orderNo": 42, "status": null}
        }));
        match Observation::from_order_alert(&message) {
            Observation::OrderStatus { status, order_id, .. } => {
                assert_eq!(order_id, "42");
                assert_eq!(status, UNKNOWN_STATUS);
            }
            other => panic!("Expected OrderStatus, got {other:?}"),
        }
    }
}
