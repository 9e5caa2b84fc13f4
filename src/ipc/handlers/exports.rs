use crate::export::bundle::{verify_bundle, write_bundle};
use crate::export::error::ExportError;
use crate::export::{
    save_artifact, ExportJob, ExportSource, BUNDLE_EXTENSION, PDF_EXTENSION, XLSX_EXTENSION,
};
use crate::ipc::error::{err, export_err, ok};
use crate::ipc::types::{AppState, Request};
use crate::report::filter::filter_rows;
use crate::report::model::{NormalizedReportRow, ReportSection, SubjectCatalog};
use crate::report::normalize::{normalize_records, partition_subjects, RecordWarning};
use crate::report::shape::ReportColumns;
use log::info;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use super::reports::{parse_params, ReportParams};

/// Normalized tables for one export request: one unlabelled table for
/// `records`, or one per entry of `sections`.
struct Prepared {
    catalog: SubjectCatalog,
    tables: Vec<(String, Vec<NormalizedReportRow>)>,
    sectioned: bool,
    warnings: Vec<RecordWarning>,
}

fn prepare(params: &ReportParams) -> Prepared {
    let catalog = partition_subjects(&params.subjects);
    let mut warnings = Vec::new();
    let mut tables = Vec::new();
    match &params.sections {
        Some(sections) => {
            for section in sections {
                let normalized = normalize_records(&section.records, &params.subjects);
                warnings.extend(normalized.warnings);
                tables.push((section.label.clone(), normalized.rows));
            }
        }
        None => {
            let normalized = normalize_records(&params.records, &params.subjects);
            warnings.extend(normalized.warnings);
            tables.push((String::new(), normalized.rows));
        }
    }
    Prepared {
        catalog,
        tables,
        sectioned: params.sections.is_some(),
        warnings,
    }
}

fn build_job<'a>(params: &ReportParams, prepared: &'a Prepared) -> ExportJob<'a> {
    let source = if prepared.sectioned {
        ExportSource::Sections(
            prepared
                .tables
                .iter()
                .map(|(label, rows)| ReportSection {
                    label: label.clone(),
                    rows: filter_rows(rows, &params.group_filter),
                })
                .collect(),
        )
    } else {
        let rows = prepared
            .tables
            .first()
            .map(|(_, rows)| filter_rows(rows, &params.group_filter))
            .unwrap_or_default();
        ExportSource::Rows(rows)
    };
    ExportJob {
        source,
        columns: ReportColumns::from_catalog(params.kind, &prepared.catalog),
        metadata: params.metadata.clone(),
        single_shot: params.single_shot,
        generated_at: chrono::Local::now().naive_local(),
    }
}

fn out_dir(state: &AppState, params: &ReportParams) -> PathBuf {
    state.settings.output_dir(params.out_dir.as_deref())
}

fn handle_export_xlsx(state: &mut AppState, req: &Request) -> Value {
    let params = match parse_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let prepared = prepare(&params);
    let job = build_job(&params, &prepared);
    let book = match job.spreadsheet(&state.settings) {
        Ok(v) => v,
        Err(e) => return export_err(&req.id, &e),
    };
    let saved = match save_artifact(&out_dir(state, &params), &job.file_name(XLSX_EXTENSION), &book.bytes) {
        Ok(v) => v,
        Err(e) => return export_err(&req.id, &e),
    };
    info!("xlsx export {} ({} sheets)", saved.file_name, book.sheet_names.len());
    ok(
        &req.id,
        json!({
            "path": saved.path.to_string_lossy(),
            "fileName": saved.file_name,
            "bytes": saved.bytes,
            "sheetCount": book.sheet_names.len(),
            "sheetNames": book.sheet_names,
            "warnings": prepared.warnings,
        }),
    )
}

fn handle_export_pdf(state: &mut AppState, req: &Request) -> Value {
    let params = match parse_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let prepared = prepare(&params);
    let job = build_job(&params, &prepared);
    let doc = match job.document(&state.settings) {
        Ok(v) => v,
        Err(e) => return export_err(&req.id, &e),
    };
    let saved = match save_artifact(&out_dir(state, &params), &job.file_name(PDF_EXTENSION), &doc.bytes) {
        Ok(v) => v,
        Err(e) => return export_err(&req.id, &e),
    };
    info!("pdf export {} ({} pages)", saved.file_name, doc.page_count);
    ok(
        &req.id,
        json!({
            "path": saved.path.to_string_lossy(),
            "fileName": saved.file_name,
            "bytes": saved.bytes,
            "pageCount": doc.page_count,
            "warnings": prepared.warnings,
        }),
    )
}

fn handle_export_bundle(state: &mut AppState, req: &Request) -> Value {
    let params = match parse_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let prepared = prepare(&params);
    let job = build_job(&params, &prepared);
    let rendered = job
        .spreadsheet(&state.settings)
        .and_then(|book| Ok((book, job.document(&state.settings)?)));
    let (book, doc) = match rendered {
        Ok(v) => v,
        Err(e) => return export_err(&req.id, &e),
    };

    let file_name = job.file_name(BUNDLE_EXTENSION);
    let path = out_dir(state, &params).join(&file_name);
    let artifacts = vec![
        (job.file_name(XLSX_EXTENSION), book.bytes),
        (job.file_name(PDF_EXTENSION), doc.bytes),
    ];
    let manifest = match write_bundle(&path, &artifacts) {
        Ok(v) => v,
        Err(e) => return export_err(&req.id, &ExportError::Bundle(e)),
    };
    let bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    info!("bundle export {} ({})", file_name, manifest.export_id);
    ok(
        &req.id,
        json!({
            "path": path.to_string_lossy(),
            "fileName": file_name,
            "bytes": bytes,
            "exportId": manifest.export_id,
            "entries": manifest.entries,
            "pageCount": doc.page_count,
            "sheetCount": book.sheet_names.len(),
            "warnings": prepared.warnings,
        }),
    )
}

fn handle_verify_bundle(_state: &mut AppState, req: &Request) -> Value {
    let Some(path) = req.params.get("path").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    match verify_bundle(Path::new(path)) {
        Ok(manifest) => ok(&req.id, json!({ "valid": true, "manifest": manifest })),
        Err(e) => err(
            &req.id,
            "bundle_invalid",
            format!("{:#}", e),
            Some(json!({ "path": path })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "reports.exportXlsx" => Some(handle_export_xlsx(state, req)),
        "reports.exportPdf" => Some(handle_export_pdf(state, req)),
        "reports.exportBundle" => Some(handle_export_bundle(state, req)),
        "reports.verifyBundle" => Some(handle_verify_bundle(state, req)),
        _ => None,
    }
}
