use serde::Deserialize;

use crate::settings::ExportSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Only configuration survives between requests; report data never does.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub settings: ExportSettings,
}
