use anyhow::{anyhow, Context};
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::export::pdf::decoration::PageDecoration;

pub const CONFIG_ENV: &str = "REPORTD_CONFIG";
pub const DEFAULT_SUBTITLE: &str = "Academic Report";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_OUTPUT_DIR: &str = "reportd-exports";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

/// Process-wide export defaults. Per-request metadata wins over these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    pub organization_name: String,
    pub subtitle: String,
    pub logo: Option<Value>,
    pub output_dir: Option<PathBuf>,
    pub orientation: Orientation,
    pub date_format: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            organization_name: String::new(),
            subtitle: DEFAULT_SUBTITLE.to_string(),
            logo: None,
            output_dir: None,
            orientation: Orientation::Landscape,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

pub fn load_settings(path: &Path) -> anyhow::Result<ExportSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.to_string_lossy()))?;
    let settings: ExportSettings = serde_json::from_str(&text)
        .with_context(|| format!("settings {} are invalid", path.to_string_lossy()))?;
    Ok(settings.validated())
}

/// Settings named by `REPORTD_CONFIG`, or defaults when unset or unreadable.
pub fn from_env() -> ExportSettings {
    let Some(path) = std::env::var_os(CONFIG_ENV) else {
        return ExportSettings::default();
    };
    match load_settings(Path::new(&path)) {
        Ok(settings) => {
            info!("loaded settings from {}", Path::new(&path).to_string_lossy());
            settings
        }
        Err(e) => {
            warn!("using default settings: {:#}", e);
            ExportSettings::default()
        }
    }
}

impl ExportSettings {
    /// Overlays the keys present in `patch`; `null` resets a key to its default.
    pub fn merge(&self, patch: &Value) -> anyhow::Result<ExportSettings> {
        let Some(patch) = patch.as_object() else {
            return Err(anyhow!("settings patch must be an object"));
        };
        let defaults = serde_json::to_value(ExportSettings::default())?;
        let mut current = serde_json::to_value(self)?;
        if let Some(obj) = current.as_object_mut() {
            for (key, value) in patch {
                let value = if value.is_null() {
                    defaults.get(key).cloned().unwrap_or(Value::Null)
                } else {
                    value.clone()
                };
                obj.insert(key.clone(), value);
            }
        }
        let merged: ExportSettings =
            serde_json::from_value(current).context("settings patch has invalid values")?;
        Ok(merged.validated())
    }

    fn validated(mut self) -> Self {
        // Offset and zone specifiers parse but cannot format a naive timestamp.
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error))
            || sample_timestamp().is_some_and(|t| format_date(t, &self.date_format).is_none())
        {
            warn!("invalid date format {:?}; using {}", self.date_format, DEFAULT_DATE_FORMAT);
            self.date_format = DEFAULT_DATE_FORMAT.to_string();
        }
        self
    }

    pub fn landscape(&self) -> bool {
        self.orientation == Orientation::Landscape
    }

    pub fn output_dir(&self, requested: Option<&Path>) -> PathBuf {
        requested
            .map(Path::to_path_buf)
            .or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_OUTPUT_DIR))
    }

    pub fn decoration(&self, now: NaiveDateTime) -> PageDecoration {
        PageDecoration {
            subtitle: self.subtitle.clone(),
            generated_on: format_date(now, &self.date_format)
                .or_else(|| format_date(now, DEFAULT_DATE_FORMAT))
                .unwrap_or_default(),
            default_organization: self.organization_name.clone(),
            default_logo: self.logo.clone(),
        }
    }
}

fn sample_timestamp() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2000, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn format_date(at: NaiveDateTime, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", at.format(format)).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_keys_take_defaults() {
        let s: ExportSettings = serde_json::from_value(json!({ "organizationName": "Hill" })).unwrap();
        assert_eq!(s.organization_name, "Hill");
        assert_eq!(s.subtitle, DEFAULT_SUBTITLE);
        assert!(s.landscape());
    }

    #[test]
    fn merge_overlays_and_resets() {
        let base = ExportSettings {
            subtitle: "Custom".into(),
            ..Default::default()
        };
        let merged = base
            .merge(&json!({ "orientation": "portrait", "subtitle": null }))
            .unwrap();
        assert_eq!(merged.orientation, Orientation::Portrait);
        assert_eq!(merged.subtitle, DEFAULT_SUBTITLE);
        assert!(base.merge(&json!(["x"])).is_err());
        assert!(base.merge(&json!({ "orientation": "sideways" })).is_err());
    }

    #[test]
    fn invalid_date_format_falls_back() {
        let merged = ExportSettings::default()
            .merge(&json!({ "dateFormat": "%Q" }))
            .unwrap();
        assert_eq!(merged.date_format, DEFAULT_DATE_FORMAT);

        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .unwrap();
        assert_eq!(merged.decoration(now).generated_on, "2026-10-19");
    }

    #[test]
    fn zone_specifiers_fall_back_instead_of_failing_later() {
        let merged = ExportSettings::default()
            .merge(&json!({ "dateFormat": "%Y-%m-%d %z" }))
            .unwrap();
        assert_eq!(merged.date_format, DEFAULT_DATE_FORMAT);

        let raw = ExportSettings {
            date_format: "%d/%m/%Y %Z".into(),
            ..Default::default()
        };
        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .unwrap();
        assert_eq!(raw.decoration(now).generated_on, "2026-10-19");
    }

    #[test]
    fn requested_output_dir_wins() {
        let s = ExportSettings {
            output_dir: Some(PathBuf::from("/srv/reports")),
            ..Default::default()
        };
        assert_eq!(s.output_dir(Some(Path::new("/tmp/x"))), PathBuf::from("/tmp/x"));
        assert_eq!(s.output_dir(None), PathBuf::from("/srv/reports"));
    }
}
