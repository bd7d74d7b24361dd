use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A pin's value as carried on the wire: a bare JSON scalar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl PinValue {
    /// Interprets operator input according to the descriptor's `type` tag.
    /// Input that does not parse for its tag stays text.
    pub fn parse_for_type(kind: &str, input: &str) -> Self {
        let trimmed = input.trim();
        match kind {
            "numeric" => trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(PinValue::Number)
                .unwrap_or_else(|| PinValue::Text(input.to_string())),
            "boolean" => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => PinValue::Boolean(true),
                "false" | "0" => PinValue::Boolean(false),
                _ => PinValue::Text(input.to_string()),
            },
            _ => PinValue::Text(input.to_string()),
        }
    }

    pub fn display_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinValue::Boolean(value) => write!(f, "{}", value),
            PinValue::Number(value) => {
                if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
                    write!(f, "{}", *value as i64)
                } else {
                    write!(f, "{}", value)
                }
            }
            PinValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for PinValue {
    fn from(value: f64) -> Self {
        PinValue::Number(value)
    }
}

impl From<bool> for PinValue {
    fn from(value: bool) -> Self {
        PinValue::Boolean(value)
    }
}

impl From<&str> for PinValue {
    fn from(value: &str) -> Self {
        PinValue::Text(value.to_string())
    }
}

impl From<String> for PinValue {
    fn from(value: String) -> Self {
        PinValue::Text(value)
    }
}

/// Display text for an optional value; pins without a value render empty.
pub fn display_value(value: Option<&PinValue>) -> String {
    value.map(PinValue::display_text).unwrap_or_default()
}

/// Server-rendered markup for one pin. Injected verbatim, never parsed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderFragment {
    pub topic: String,
    pub value: String,
    #[serde(default, alias = "editableMarkup")]
    pub editable: String,
}

/// One `(value, timestamp_ms)` pair of a pin's write history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry(pub Option<PinValue>, pub u64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinDescriptor {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub value: Option<PinValue>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_true")]
    pub readable: bool,
    #[serde(default = "default_true")]
    pub writable: bool,
    #[serde(alias = "renderFragment", default)]
    pub html_template: RenderFragment,
    // Carried for interface compatibility; nothing in the dashboard reads it.
    #[serde(default, alias = "valueHistory")]
    pub value_history: Vec<HistoryEntry>,
}

fn default_true() -> bool {
    true
}

/// Body of `POST /pin_value`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PinValueRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read_pins: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub write_pins: BTreeMap<String, PinValue>,
}

impl PinValueRequest {
    pub fn read(names: Vec<String>) -> Self {
        Self {
            read_pins: names,
            write_pins: BTreeMap::new(),
        }
    }

    pub fn write(name: impl Into<String>, value: PinValue) -> Self {
        let mut write_pins = BTreeMap::new();
        write_pins.insert(name.into(), value);
        Self {
            read_pins: Vec::new(),
            write_pins,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PinValueResponse {
    #[serde(default)]
    pub read_pins: Option<BTreeMap<String, Option<PinValue>>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: u64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_like_the_browser_would() {
        assert_eq!(PinValue::Number(12.0).to_string(), "12");
        assert_eq!(PinValue::Number(-3.5).to_string(), "-3.5");
        assert_eq!(PinValue::Boolean(false).to_string(), "false");
        assert_eq!(PinValue::from("hi").to_string(), "hi");
        assert_eq!(display_value(None), "");
    }

    #[test]
    fn input_is_typed_by_descriptor_tag() {
        assert_eq!(PinValue::parse_for_type("numeric", " 42 "), PinValue::Number(42.0));
        assert_eq!(PinValue::parse_for_type("numeric", "abc"), PinValue::from("abc"));
        assert_eq!(PinValue::parse_for_type("boolean", "TRUE"), PinValue::Boolean(true));
        assert_eq!(PinValue::parse_for_type("boolean", "0"), PinValue::Boolean(false));
        assert_eq!(PinValue::parse_for_type("string", "12"), PinValue::from("12"));
    }

    #[test]
    fn descriptor_parses_server_payload_with_defaults() {
        let json = r#"{
            "name": "temp",
            "value": 12,
            "type": "numeric",
            "html_template": {"topic": "<span>temp</span>", "value": "<span>12</span>"},
            "readable": true,
            "writable": false
        }"#;
        let pin: PinDescriptor = serde_json::from_str(json).expect("descriptor");
        assert_eq!(pin.name, "temp");
        assert_eq!(pin.namespace, "");
        assert_eq!(pin.value, Some(PinValue::Number(12.0)));
        assert!(!pin.writable);
        assert_eq!(pin.html_template.editable, "");
        assert!(pin.value_history.is_empty());
    }

    #[test]
    fn descriptor_accepts_camel_case_fragment_alias() {
        let json = r#"{
            "name": "flag",
            "value": null,
            "type": "boolean",
            "renderFragment": {"topic": "t", "value": "v", "editableMarkup": "e"},
            "valueHistory": [[true, 10], [false, 20]]
        }"#;
        let pin: PinDescriptor = serde_json::from_str(json).expect("descriptor");
        assert_eq!(pin.value, None);
        assert!(pin.writable);
        assert_eq!(pin.html_template.editable, "e");
        assert_eq!(pin.value_history[1], HistoryEntry(Some(PinValue::Boolean(false)), 20));
    }

    #[test]
    fn empty_request_fields_are_omitted() {
        let request = PinValueRequest::write("temp", PinValue::Number(3.0));
        let json = serde_json::to_value(&request).expect("json");
        assert_eq!(json, serde_json::json!({ "write_pins": { "temp": 3.0 } }));

        let request = PinValueRequest::read(vec!["a".to_string()]);
        let json = serde_json::to_value(&request).expect("json");
        assert_eq!(json, serde_json::json!({ "read_pins": ["a"] }));
    }
}
