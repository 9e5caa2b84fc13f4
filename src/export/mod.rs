//! Artifact serializers and the pipeline that feeds them one table shape.

pub mod bundle;
pub mod error;
pub mod pdf;
pub mod xlsx;

use chrono::NaiveDateTime;
use log::info;
use std::path::{Path, PathBuf};

use self::error::ExportError;
use self::pdf::{DocumentOptions, RenderedDocument};
use self::xlsx::RenderedWorkbook;
use crate::report::model::{NormalizedReportRow, ReportMetadata, ReportSection};
use crate::report::naming::{file_name, file_stem};
use crate::report::shape::ReportColumns;
use crate::settings::ExportSettings;

pub const XLSX_EXTENSION: &str = "xlsx";
pub const PDF_EXTENSION: &str = "pdf";
pub const BUNDLE_EXTENSION: &str = "zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: usize,
}

/// Writes `bytes` to `dir/file_name`, creating `dir` when needed.
pub fn save_artifact(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<SavedArtifact, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(file_name);
    std::fs::write(&path, bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    info!("saved {} ({} bytes)", path.to_string_lossy(), bytes.len());
    Ok(SavedArtifact {
        path,
        file_name: file_name.to_string(),
        bytes: bytes.len(),
    })
}

/// Rows to export: a single table or labelled sections.
#[derive(Debug, Clone)]
pub enum ExportSource<'a> {
    Rows(Vec<&'a NormalizedReportRow>),
    Sections(Vec<ReportSection<'a>>),
}

impl ExportSource<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            ExportSource::Rows(rows) => rows.is_empty(),
            ExportSource::Sections(sections) => sections.iter().all(|s| s.rows.is_empty()),
        }
    }
}

/// One export invocation. Both serializers read the same columns and rows.
#[derive(Debug, Clone)]
pub struct ExportJob<'a> {
    pub source: ExportSource<'a>,
    pub columns: ReportColumns,
    pub metadata: ReportMetadata,
    /// Daily exports carry the generation time in their file name.
    pub single_shot: bool,
    pub generated_at: NaiveDateTime,
}

impl ExportJob<'_> {
    pub fn file_stem(&self) -> String {
        let stamp = self.single_shot.then_some(self.generated_at);
        file_stem(&self.metadata.title, &self.metadata.scope_labels(), stamp)
    }

    pub fn file_name(&self, extension: &str) -> String {
        file_name(&self.file_stem(), extension)
    }

    fn organization<'s>(&'s self, settings: &'s ExportSettings) -> &'s str {
        let name = self.metadata.organization_name.trim();
        if name.is_empty() {
            settings.organization_name.as_str()
        } else {
            name
        }
    }

    pub fn spreadsheet(&self, settings: &ExportSettings) -> Result<RenderedWorkbook, ExportError> {
        let organization = self.organization(settings);
        match &self.source {
            ExportSource::Rows(rows) => {
                xlsx::to_spreadsheet(rows, &self.columns, &self.metadata, organization)
            }
            ExportSource::Sections(sections) => {
                xlsx::to_spreadsheet_sections(sections, &self.columns, &self.metadata, organization)
            }
        }
    }

    pub fn document(&self, settings: &ExportSettings) -> Result<RenderedDocument, ExportError> {
        let options = DocumentOptions {
            decoration: settings.decoration(self.generated_at),
            landscape: settings.landscape(),
        };
        match &self.source {
            ExportSource::Rows(rows) => pdf::to_document(rows, &self.columns, &self.metadata, &options),
            ExportSource::Sections(sections) => {
                pdf::to_document_sections(sections, &self.columns, &self.metadata, &options)
            }
        }
    }
}
