use std::collections::{BTreeMap, HashMap, VecDeque};

use thiserror::Error;

use pin_scanner::escape_html;
use pin_scanner::models::{
    display_value, HistoryEntry, PinDescriptor, PinValue, PinValueRequest, PinValueResponse,
    RenderFragment,
};

use crate::util::now_ms;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PinKind {
    Numeric,
    Boolean,
    Text,
    /// Write-only trigger; holds no value and fires on every write.
    Event,
}

impl PinKind {
    pub(crate) fn tag(self) -> &'static str {
        match self {
            PinKind::Numeric => "numeric",
            PinKind::Boolean => "boolean",
            PinKind::Text => "string",
            PinKind::Event => "event",
        }
    }

    /// Numeric pins take numbers or numeric strings, boolean pins take booleans
    /// or `true`/`false` strings, string and event pins take any scalar.
    pub(crate) fn coerce(self, value: &PinValue) -> Option<PinValue> {
        match (self, value) {
            (PinKind::Numeric, PinValue::Number(number)) => Some(PinValue::Number(*number)),
            (PinKind::Numeric, PinValue::Text(text)) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map(PinValue::Number),
            (PinKind::Boolean, PinValue::Boolean(flag)) => Some(PinValue::Boolean(*flag)),
            (PinKind::Boolean, PinValue::Text(text)) => {
                match text.trim().to_ascii_lowercase().as_str() {
                    "true" => Some(PinValue::Boolean(true)),
                    "false" => Some(PinValue::Boolean(false)),
                    _ => None,
                }
            }
            (PinKind::Text, other) => Some(PinValue::Text(other.to_string())),
            (PinKind::Event, payload) => Some(payload.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum StoreError {
    #[error("pin {0:?} not found")]
    UnknownPin(String),
    #[error("pin {0:?} is already registered")]
    Duplicate(String),
    #[error("pin {0:?} is not writable")]
    NotWritable(String),
    #[error("pin {0:?} is not readable")]
    NotReadable(String),
    #[error("event pin {0:?} must be writable and hold no value")]
    InvalidEvent(String),
    #[error("value {value} does not fit {kind} pin {name:?}")]
    KindMismatch {
        name: String,
        kind: &'static str,
        value: String,
    },
}

struct StoredPin {
    name: String,
    namespace: String,
    kind: PinKind,
    value: Option<PinValue>,
    readable: bool,
    writable: bool,
    history: VecDeque<HistoryEntry>,
}

/// A write to an event pin, waiting for the host program to act on it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FiredEvent {
    pub(crate) name: String,
    pub(crate) payload: PinValue,
}

impl StoredPin {
    fn readable_value(&self) -> Option<PinValue> {
        if self.readable {
            self.value.clone()
        } else {
            None
        }
    }

    fn render(&self) -> RenderFragment {
        let name = escape_html(&self.name);
        let shown = escape_html(&display_value(self.readable_value().as_ref()));
        let topic = if self.namespace.is_empty() {
            format!("<span class=\"pin-topic\">{}</span>", name)
        } else {
            format!(
                "<span class=\"pin-topic\" title=\"{}\">{}</span>",
                escape_html(&self.namespace),
                name
            )
        };
        let value = format!("<span class=\"pin-value\">{}</span>", shown);
        let editable = if !self.writable {
            String::new()
        } else {
            match self.kind {
                PinKind::Numeric => format!(
                    "<input type=\"number\" step=\"any\" class=\"value-input\" value=\"{}\">",
                    shown
                ),
                PinKind::Boolean => {
                    let checked = if matches!(self.value, Some(PinValue::Boolean(true))) {
                        " checked"
                    } else {
                        ""
                    };
                    format!("<input type=\"checkbox\" class=\"value-input\"{}>", checked)
                }
                PinKind::Text => format!(
                    "<input type=\"text\" class=\"value-input\" value=\"{}\">",
                    shown
                ),
                PinKind::Event => {
                    "<input type=\"text\" class=\"value-input event-payload\" value=\"\">"
                        .to_string()
                }
            }
        };
        RenderFragment {
            topic,
            value,
            editable,
        }
    }

    fn descriptor(&self) -> PinDescriptor {
        PinDescriptor {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            value: self.readable_value(),
            kind: self.kind.tag().to_string(),
            readable: self.readable,
            writable: self.writable,
            html_template: self.render(),
            value_history: self.history.iter().cloned().collect(),
        }
    }
}

/// Registration-ordered set of pins served by `/all_pins` and `/pin_value`.
pub(crate) struct PinStore {
    pins: Vec<StoredPin>,
    index: HashMap<String, usize>,
    history_limit: usize,
    fired: Vec<FiredEvent>,
}

impl PinStore {
    pub(crate) fn new(history_limit: usize) -> Self {
        Self {
            pins: Vec::new(),
            index: HashMap::new(),
            history_limit,
            fired: Vec::new(),
        }
    }

    pub(crate) fn register(
        &mut self,
        namespace: &str,
        name: &str,
        kind: PinKind,
        value: Option<PinValue>,
        writable: bool,
    ) -> Result<(), StoreError> {
        if self.index.contains_key(name) {
            return Err(StoreError::Duplicate(name.to_string()));
        }
        if kind == PinKind::Event && (value.is_some() || !writable) {
            return Err(StoreError::InvalidEvent(name.to_string()));
        }
        let value = match value {
            Some(value) => Some(Self::coerce_for(name, kind, &value)?),
            None => None,
        };
        let mut pin = StoredPin {
            name: name.to_string(),
            namespace: namespace.to_string(),
            kind,
            value: None,
            readable: kind != PinKind::Event,
            writable,
            history: VecDeque::new(),
        };
        if let Some(value) = value {
            Self::record(&mut pin, value, self.history_limit, &mut self.fired);
        }
        self.index.insert(name.to_string(), self.pins.len());
        self.pins.push(pin);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.pins.len()
    }

    pub(crate) fn descriptors(&self) -> Vec<PinDescriptor> {
        self.pins.iter().map(StoredPin::descriptor).collect()
    }

    pub(crate) fn descriptor(&self, name: &str) -> Result<PinDescriptor, StoreError> {
        self.find(name).map(StoredPin::descriptor)
    }

    pub(crate) fn value(&self, name: &str) -> Result<Option<PinValue>, StoreError> {
        self.find(name).map(StoredPin::readable_value)
    }

    /// Sets a value on behalf of the host program; writability is not checked.
    /// On an event pin this fires the event.
    pub(crate) fn set_value(&mut self, name: &str, value: PinValue) -> Result<(), StoreError> {
        let position = self.position(name)?;
        let history_limit = self.history_limit;
        let pin = &mut self.pins[position];
        let value = Self::coerce_for(&pin.name, pin.kind, &value)?;
        Self::record(pin, value, history_limit, &mut self.fired);
        Ok(())
    }

    /// Events fired since the last call, in firing order.
    pub(crate) fn drain_events(&mut self) -> Vec<FiredEvent> {
        std::mem::take(&mut self.fired)
    }

    /// Applies `write_pins` then answers `read_pins`. The whole request is
    /// validated first; a rejected request changes nothing.
    #[cfg(test)]
    pub(crate) fn apply(
        &mut self,
        request: &PinValueRequest,
    ) -> Result<PinValueResponse, StoreError> {
        self.apply_writes(request)?;
        self.answer_reads(&request.read_pins)
    }

    /// Validates the whole request, then records its writes. Events fired by
    /// the writes wait in [`PinStore::drain_events`].
    pub(crate) fn apply_writes(&mut self, request: &PinValueRequest) -> Result<(), StoreError> {
        let mut writes = Vec::with_capacity(request.write_pins.len());
        for (name, value) in &request.write_pins {
            let position = self.position(name)?;
            let pin = &self.pins[position];
            if !pin.writable {
                return Err(StoreError::NotWritable(name.clone()));
            }
            writes.push((position, Self::coerce_for(name, pin.kind, value)?));
        }
        for name in &request.read_pins {
            if !self.find(name)?.readable {
                return Err(StoreError::NotReadable(name.clone()));
            }
        }

        let history_limit = self.history_limit;
        for (position, value) in writes {
            Self::record(&mut self.pins[position], value, history_limit, &mut self.fired);
        }
        Ok(())
    }

    pub(crate) fn answer_reads(&self, read_pins: &[String]) -> Result<PinValueResponse, StoreError> {
        if read_pins.is_empty() {
            return Ok(PinValueResponse { read_pins: None });
        }
        let mut reads = BTreeMap::new();
        for name in read_pins {
            reads.insert(name.clone(), self.value(name)?);
        }
        Ok(PinValueResponse {
            read_pins: Some(reads),
        })
    }

    fn find(&self, name: &str) -> Result<&StoredPin, StoreError> {
        self.position(name).map(|position| &self.pins[position])
    }

    fn position(&self, name: &str) -> Result<usize, StoreError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::UnknownPin(name.to_string()))
    }

    fn coerce_for(name: &str, kind: PinKind, value: &PinValue) -> Result<PinValue, StoreError> {
        kind.coerce(value).ok_or_else(|| StoreError::KindMismatch {
            name: name.to_string(),
            kind: kind.tag(),
            value: value.to_string(),
        })
    }

    fn record(
        pin: &mut StoredPin,
        value: PinValue,
        history_limit: usize,
        fired: &mut Vec<FiredEvent>,
    ) {
        if pin.kind == PinKind::Event {
            fired.push(FiredEvent {
                name: pin.name.clone(),
                payload: value.clone(),
            });
        } else {
            pin.value = Some(value.clone());
        }
        if history_limit == 0 {
            return;
        }
        pin.history.push_back(HistoryEntry(Some(value), now_ms()));
        while pin.history.len() > history_limit {
            pin.history.pop_front();
        }
    }
}
