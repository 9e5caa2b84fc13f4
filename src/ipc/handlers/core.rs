use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use log::info;
use serde_json::json;

fn settings_json(state: &AppState) -> serde_json::Value {
    serde_json::to_value(&state.settings).unwrap_or_else(|_| json!({}))
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "settings": settings_json(state),
        }),
    )
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, settings_json(state))
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.settings.merge(&req.params) {
        Ok(merged) => {
            state.settings = merged;
            info!("settings updated");
            ok(&req.id, settings_json(state))
        }
        Err(e) => err(&req.id, "bad_params", format!("{:#}", e), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
