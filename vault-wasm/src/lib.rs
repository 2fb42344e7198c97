//! WASM <-> JavaScript bridge for the vault pages.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use vault_core::{VaultConfig, VaultError};
use vault_insights::payload::parse_datetime;
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsVaultConfig {
    #[serde(default)]
    default_cycle_length: Option<u32>,
    #[serde(default)]
    default_period_length: Option<u32>,
}

impl From<JsVaultConfig> for VaultConfig {
    fn from(cfg: JsVaultConfig) -> Self {
        let mut base = VaultConfig::default();
        if let Some(days) = cfg.default_cycle_length {
            base.default_cycle_length = days;
        }
        if let Some(days) = cfg.default_period_length {
            base.default_period_length = days;
        }
        base.validated()
    }
}

/// Bucket an appointment list (array or `{ appointments }`) into upcoming,
/// past and per-provider rollups. `now` is an ISO timestamp; defaults to the
/// current time.
#[wasm_bindgen(js_name = aggregateAppointments)]
pub fn aggregate_appointments(payload: JsValue, now: Option<String>) -> Result<JsValue, JsValue> {
    init();

    let payload = read_payload(payload)?;
    let now = resolve_now(now)?;

    let overview = vault_insights::aggregate_appointments_value(&payload, now)
        .map_err(|err| JsValue::from_str(&format_vault_error(err)))?;

    to_value(&overview)
        .map_err(|err| JsValue::from_str(&format!("Could not serialize overview: {err}")))
}

/// Predict the current cycle from `{ lastPeriodStart, cycleLength, periodLength, entries }`.
#[wasm_bindgen(js_name = analyzeCycle)]
pub fn analyze_cycle(
    payload: JsValue,
    now: Option<String>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    init();

    let payload = read_payload(payload)?;
    let now = resolve_now(now)?;

    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsVaultConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Could not read config: {err}")))?;
            VaultConfig::from(cfg)
        }
        None => VaultConfig::default(),
    };

    let analysis = vault_insights::analyze_cycle_value(&payload, now, &cfg)
        .map_err(|err| JsValue::from_str(&format_vault_error(err)))?;

    to_value(&analysis)
        .map_err(|err| JsValue::from_str(&format!("Could not serialize analysis: {err}")))
}

fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn read_payload(payload: JsValue) -> Result<serde_json::Value, JsValue> {
    from_value::<serde_json::Value>(payload)
        .map_err(|err| JsValue::from_str(&format!("Could not read JSON payload: {err}")))
}

fn resolve_now(now: Option<String>) -> Result<DateTime<Utc>, JsValue> {
    match now {
        Some(raw) => parse_datetime(&raw)
            .ok_or_else(|| JsValue::from_str(&format!("Invalid evaluation time {raw:?}"))),
        None => Ok(Utc::now()),
    }
}

fn format_vault_error(err: VaultError) -> String {
    format!("Vault error: {err}")
}
