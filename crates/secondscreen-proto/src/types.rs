//! Wire types for the presentation method channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Binary power state of an output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

/// Snapshot of one output surface at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayDescriptor {
    /// Platform-assigned id; may be reused after a disconnect.
    pub display_id: i32,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub density: f32,
    pub refresh_rate: f32,
    /// Surface advertises itself as suitable for presentations.
    pub is_presentation: bool,
    /// Any surface other than the primary one.
    pub is_external: bool,
    pub power: PowerState,
}

/// One inbound call on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Caller-chosen correlation id, echoed back in the response.
    #[serde(default)]
    pub id: Value,
    pub method: String,
    /// Arguments in whatever shape the caller sent them.
    #[serde(default)]
    pub args: Value,
}

/// Error body carried by a failed [`MethodResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodError {
    pub code: String,
    pub message: String,
}

impl MethodError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Response to a [`MethodCall`]; exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResponse {
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MethodError>,
}

impl MethodResponse {
    pub const fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub const fn err(id: Value, error: MethodError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Manager → caller notification (e.g. `presentationReady`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationFrame {
    pub notification: String,
    pub args: Value,
}

/// Display connect (`1`) / disconnect (`0`) event frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEventFrame {
    pub event: String,
    pub value: i32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_serializes_camel_case() {
        let descriptor = DisplayDescriptor {
            display_id: 2,
            name: "HDMI".into(),
            width: 1920,
            height: 1080,
            density: 2.0,
            refresh_rate: 60.0,
            is_presentation: true,
            is_external: true,
            power: PowerState::On,
        };
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["displayId"], 2);
        assert_eq!(value["refreshRate"], 60.0);
        assert_eq!(value["isExternal"], true);
        assert_eq!(value["power"], "on");
    }

    #[test]
    fn response_omits_absent_side() {
        let ok = serde_json::to_value(MethodResponse::ok(json!(7), json!(true))).unwrap();
        assert_eq!(ok, json!({"id": 7, "result": true}));

        let err = MethodResponse::err(json!(8), MethodError::new("X", "boom"));
        assert!(!err.is_ok());
        let err = serde_json::to_value(err).unwrap();
        assert_eq!(err["error"]["code"], "X");
        assert!(err.get("result").is_none());
    }

    #[test]
    fn call_defaults_missing_args_to_null() {
        let call: MethodCall =
            serde_json::from_str(r#"{"id":1,"method":"hideAllPresentations"}"#).unwrap();
        assert_eq!(call.method, "hideAllPresentations");
        assert!(call.args.is_null());
    }
}
