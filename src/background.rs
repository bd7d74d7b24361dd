use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use pin_scanner::models::PinValue;

use crate::constants::{DEMO_COUNTER_MODULUS, DEMO_NAMESPACE};
use crate::state::AppState;
use crate::store::{PinKind, PinStore};

pub(crate) const COUNTER_PIN: &str = "counter";
pub(crate) const GREETING_PIN: &str = "greeting";
pub(crate) const ENABLED_PIN: &str = "enabled";
pub(crate) const UPTIME_PIN: &str = "uptime_s";
pub(crate) const RESET_PIN: &str = "reset_counter";

pub(crate) fn register_demo_pins(store: &mut PinStore) -> Result<()> {
    let pins = [
        (COUNTER_PIN, PinKind::Numeric, Some(PinValue::Number(0.0)), true),
        (GREETING_PIN, PinKind::Text, Some(PinValue::from("Hello World")), true),
        (ENABLED_PIN, PinKind::Boolean, Some(PinValue::Boolean(true)), true),
        (UPTIME_PIN, PinKind::Numeric, Some(PinValue::Number(0.0)), false),
        (RESET_PIN, PinKind::Event, None, true),
    ];
    for (name, kind, value, writable) in pins {
        store
            .register(DEMO_NAMESPACE, name, kind, value, writable)
            .with_context(|| format!("failed to register demo pin {}", name))?;
    }
    Ok(())
}

/// Advances the demo pins every `demo_tick`: the counter cycles mod 10, the
/// greeting is reversed and `uptime_s` follows the process uptime. Nothing
/// moves while `enabled` is false.
pub(crate) async fn run_demo_ticker(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(state.config.demo_tick);
    interval.tick().await;
    info!(
        tick_ms = state.config.demo_tick.as_millis() as u64,
        "demo ticker started"
    );
    loop {
        interval.tick().await;
        if let Err(err) = demo_tick(&state).await {
            warn!(%err, "demo tick failed");
        }
    }
}

/// Acts on events fired by writes since the last call. Writing
/// `reset_counter` zeroes the counter whatever the payload.
pub(crate) fn handle_demo_events(pins: &mut PinStore) -> Result<()> {
    for event in pins.drain_events() {
        match event.name.as_str() {
            RESET_PIN => {
                pins.set_value(COUNTER_PIN, PinValue::Number(0.0))?;
                info!(payload = %event.payload, "counter reset");
            }
            other => debug!(pin = other, "event without a handler"),
        }
    }
    Ok(())
}

pub(crate) async fn demo_tick(state: &AppState) -> Result<()> {
    let mut pins = state.pins.write().await;

    let uptime = state.started_at.elapsed().as_secs() as f64;
    pins.set_value(UPTIME_PIN, PinValue::Number(uptime))?;

    if pins.value(ENABLED_PIN)? != Some(PinValue::Boolean(true)) {
        return Ok(());
    }

    let counter = match pins.value(COUNTER_PIN)? {
        Some(PinValue::Number(value)) => (value + 1.0).rem_euclid(DEMO_COUNTER_MODULUS),
        _ => 0.0,
    };
    pins.set_value(COUNTER_PIN, PinValue::Number(counter))?;

    let greeting = pins
        .value(GREETING_PIN)?
        .map(|value| value.to_string().chars().rev().collect::<String>())
        .unwrap_or_default();
    pins.set_value(GREETING_PIN, PinValue::Text(greeting))?;

    debug!(counter, "demo pins advanced");
    Ok(())
}
