use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::report::filter::{filter_rows, group_subject_options};
use crate::report::model::{GroupFilterState, ReportKind, ReportMetadata, SubjectDescriptor};
use crate::report::normalize::{normalize, normalize_records, Normalized};
use crate::report::shape::{ReportColumns, ReportShape};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionParams {
    pub label: String,
    pub records: Vec<Value>,
}

/// Parameters shared by every report method. Each request carries its own
/// records and descriptors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportParams {
    pub records: Vec<Value>,
    pub sections: Option<Vec<SectionParams>>,
    pub subjects: Vec<SubjectDescriptor>,
    pub metadata: ReportMetadata,
    pub kind: ReportKind,
    pub group_filter: GroupFilterState,
    pub out_dir: Option<PathBuf>,
    pub single_shot: bool,
}

pub fn parse_params(req: &Request) -> Result<ReportParams, Value> {
    let params = if req.params.is_null() {
        json!({})
    } else {
        req.params.clone()
    };
    serde_json::from_value(params).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("invalid report params: {}", e),
            None,
        )
    })
}

fn handle_normalize(_state: &mut AppState, req: &Request) -> Value {
    let params = match parse_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Normalized {
        catalog,
        rows,
        warnings,
    } = normalize_records(&params.records, &params.subjects);
    ok(
        &req.id,
        json!({
            "rows": rows,
            "subjects": catalog.core,
            "groups": catalog.groups,
            "warnings": warnings,
        }),
    )
}

fn handle_filter(_state: &mut AppState, req: &Request) -> Value {
    let params = match parse_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let normalized = normalize_records(&params.records, &params.subjects);
    let rows = filter_rows(&normalized.rows, &params.group_filter);
    ok(
        &req.id,
        json!({
            "rows": rows,
            "rowCount": rows.len(),
            "totalCount": normalized.rows.len(),
        }),
    )
}

fn handle_group_options(_state: &mut AppState, req: &Request) -> Value {
    let params = match parse_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let rows = normalize(&params.records, &params.subjects);
    ok(&req.id, json!({ "groups": group_subject_options(&rows) }))
}

fn handle_table_model(_state: &mut AppState, req: &Request) -> Value {
    let params = match parse_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let normalized = normalize_records(&params.records, &params.subjects);
    let rows = filter_rows(&normalized.rows, &params.group_filter);
    let columns = ReportColumns::from_catalog(params.kind, &normalized.catalog);
    let shape = ReportShape::build(rows, &columns);
    ok(
        &req.id,
        json!({
            "kind": params.kind.as_str(),
            "header": shape.header(),
            "columns": shape.columns,
            "rows": shape.rows,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "reports.normalize" => Some(handle_normalize(state, req)),
        "reports.filter" => Some(handle_filter(state, req)),
        "reports.groupOptions" => Some(handle_group_options(state, req)),
        "reports.tableModel" => Some(handle_table_model(state, req)),
        _ => None,
    }
}
