//! Typed requests normalized from loosely shaped method arguments.
//!
//! Hosts send arguments as a JSON object, as a string holding an encoded
//! object, or as a bare scalar. Each request type accepts every shape that is
//! meaningful for its method so the manager only ever sees one typed struct.
//! Unknown fields are ignored.

use serde_json::{Map, Value};

/// Why arguments could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("Arguments must be an object")]
    NotAnObject,

    #[error("Missing required argument: {0}")]
    Missing(&'static str),

    #[error("Invalid value for argument {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// `listDisplay` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListDisplayRequest {
    pub category: Option<String>,
}

impl ListDisplayRequest {
    pub fn from_args(args: &Value) -> Result<Self, ArgumentError> {
        let category = match args {
            Value::Null => None,
            Value::String(raw) => match decode_object(raw) {
                Some(map) => optional_string(&map, "category")?,
                None => non_empty(raw),
            },
            Value::Object(map) => optional_string(map, "category")?,
            _ => return Err(ArgumentError::NotAnObject),
        };
        Ok(Self { category })
    }
}

/// `prewarmEngine` arguments. `None` means "use the default router name".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrewarmRequest {
    pub router_name: Option<String>,
}

impl PrewarmRequest {
    pub fn from_args(args: &Value) -> Result<Self, ArgumentError> {
        let router_name = match args {
            Value::Null => None,
            Value::String(raw) => match decode_object(raw) {
                Some(map) => optional_string(&map, "routerName")?,
                None => non_empty(raw),
            },
            Value::Object(map) => optional_string(map, "routerName")?,
            _ => return Err(ArgumentError::NotAnObject),
        };
        Ok(Self { router_name })
    }
}

/// `showPresentation` arguments; both fields are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowRequest {
    pub display_id: i32,
    pub router_name: String,
}

impl ShowRequest {
    pub fn from_args(args: &Value) -> Result<Self, ArgumentError> {
        let map = object_of(args)?;
        let display_id =
            optional_display_id(&map)?.ok_or(ArgumentError::Missing("displayId"))?;
        let router_name =
            optional_string(&map, "routerName")?.ok_or(ArgumentError::Missing("routerName"))?;
        Ok(Self {
            display_id,
            router_name,
        })
    }
}

/// `hidePresentation` arguments. Both absent means "hide everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HideRequest {
    pub display_id: Option<i32>,
    pub router_name: Option<String>,
}

impl HideRequest {
    pub fn from_args(args: &Value) -> Result<Self, ArgumentError> {
        match args {
            Value::Null => Ok(Self::default()),
            Value::Number(_) => Ok(Self {
                display_id: Some(display_id_of(args)?),
                router_name: None,
            }),
            Value::String(raw) => match decode_object(raw) {
                Some(map) => Self::from_map(&map),
                None => Ok(Self {
                    display_id: None,
                    router_name: non_empty(raw),
                }),
            },
            Value::Object(map) => Self::from_map(map),
            _ => Err(ArgumentError::NotAnObject),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self, ArgumentError> {
        Ok(Self {
            display_id: optional_display_id(map)?,
            router_name: optional_string(map, "routerName")?,
        })
    }

    pub const fn is_hide_all(&self) -> bool {
        self.display_id.is_none() && self.router_name.is_none()
    }
}

/// `transferDataToPresentation` arguments.
///
/// An object carrying a `payload` or `routerName` key is unpacked, with a
/// missing payload read as null; anything else is treated as the payload
/// itself with no explicit destination. Never fails.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub router_name: Option<String>,
    pub payload: Value,
}

impl TransferRequest {
    pub fn from_args(args: &Value) -> Self {
        let envelope = match args {
            Value::Object(map) => Some(map.clone()),
            Value::String(raw) => decode_object(raw),
            _ => None,
        };

        match envelope {
            Some(map) if map.contains_key("payload") || map.contains_key("routerName") => Self {
                router_name: map
                    .get("routerName")
                    .and_then(Value::as_str)
                    .and_then(non_empty),
                payload: map.get("payload").cloned().unwrap_or(Value::Null),
            },
            _ => Self {
                router_name: None,
                payload: args.clone(),
            },
        }
    }
}

fn decode_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn object_of(args: &Value) -> Result<Map<String, Value>, ArgumentError> {
    match args {
        Value::Object(map) => Ok(map.clone()),
        Value::String(raw) => decode_object(raw).ok_or(ArgumentError::NotAnObject),
        _ => Err(ArgumentError::NotAnObject),
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn optional_string(
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ArgumentError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(non_empty(s)),
        Some(other) => Err(ArgumentError::Invalid {
            field,
            reason: format!("expected string, got {other}"),
        }),
    }
}

fn optional_display_id(map: &Map<String, Value>) -> Result<Option<i32>, ArgumentError> {
    match map.get("displayId") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => display_id_of(value).map(Some),
    }
}

fn display_id_of(value: &Value) -> Result<i32, ArgumentError> {
    let invalid = |reason: String| ArgumentError::Invalid {
        field: "displayId",
        reason,
    };
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| invalid(format!("{n} is not a 32-bit integer"))),
        Value::String(s) => s
            .trim()
            .parse::<i32>()
            .map_err(|e| invalid(format!("{s:?}: {e}"))),
        other => Err(invalid(format!("expected integer, got {other}"))),
    }
}
