use log::{debug, info};
use rust_xlsxwriter::{DocProperties, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use super::error::ExportError;
use crate::report::model::{NormalizedReportRow, ReportMetadata, ReportSection};
use crate::report::naming::{SheetNames, DEFAULT_SECTION_SHEET_NAME, DEFAULT_SHEET_NAME};
use crate::report::shape::{Cell, ColumnRole, ReportColumns, ReportShape};

#[derive(Debug, Clone)]
pub struct RenderedWorkbook {
    pub bytes: Vec<u8>,
    pub sheet_names: Vec<String>,
}

struct SheetFormats {
    header: Format,
    text: Format,
    centered: Format,
}

impl SheetFormats {
    fn new() -> Self {
        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(0xD9D9D9)
            .set_border(FormatBorder::Thin);
        let text = Format::new().set_border(FormatBorder::Thin);
        let centered = Format::new()
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin);
        Self {
            header,
            text,
            centered,
        }
    }
}

pub fn to_spreadsheet(
    rows: &[&NormalizedReportRow],
    columns: &ReportColumns,
    metadata: &ReportMetadata,
    organization: &str,
) -> Result<RenderedWorkbook, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::EmptyDataset);
    }
    let mut workbook = new_workbook(metadata, organization);
    let formats = SheetFormats::new();
    let mut names = SheetNames::new();

    let label = if metadata.title.trim().is_empty() {
        DEFAULT_SHEET_NAME
    } else {
        metadata.title.as_str()
    };
    let name = names.claim(label, DEFAULT_SHEET_NAME);
    let shape = ReportShape::build(rows.iter().copied(), columns);
    write_sheet(workbook.add_worksheet(), &name, &shape, &formats)?;

    finish(workbook, vec![name])
}

/// One worksheet per non-empty section, in section order.
pub fn to_spreadsheet_sections(
    sections: &[ReportSection<'_>],
    columns: &ReportColumns,
    metadata: &ReportMetadata,
    organization: &str,
) -> Result<RenderedWorkbook, ExportError> {
    if sections.iter().all(|s| s.rows.is_empty()) {
        return Err(ExportError::EmptyDataset);
    }
    let mut workbook = new_workbook(metadata, organization);
    let formats = SheetFormats::new();
    let mut names = SheetNames::new();
    let mut written = Vec::new();

    for (idx, section) in sections.iter().enumerate() {
        if section.rows.is_empty() {
            debug!("skipping empty section {:?}", section.label);
            continue;
        }
        let fallback = format!("{} {}", DEFAULT_SECTION_SHEET_NAME, idx + 1);
        let name = names.claim(&section.label, &fallback);
        let shape = ReportShape::build(section.rows.iter().copied(), columns);
        write_sheet(workbook.add_worksheet(), &name, &shape, &formats)?;
        written.push(name);
    }

    finish(workbook, written)
}

fn new_workbook(metadata: &ReportMetadata, organization: &str) -> Workbook {
    let mut workbook = Workbook::new();
    let mut properties = DocProperties::new().set_title(metadata.title.trim());
    if !organization.is_empty() {
        properties = properties.set_company(organization).set_author(organization);
    }
    workbook.set_properties(&properties);
    workbook
}

fn finish(mut workbook: Workbook, sheet_names: Vec<String>) -> Result<RenderedWorkbook, ExportError> {
    let bytes = workbook.save_to_buffer()?;
    info!("rendered workbook: {} sheets, {} bytes", sheet_names.len(), bytes.len());
    Ok(RenderedWorkbook { bytes, sheet_names })
}

fn write_sheet(
    sheet: &mut Worksheet,
    name: &str,
    shape: &ReportShape,
    formats: &SheetFormats,
) -> Result<(), ExportError> {
    sheet.set_name(name)?;

    for (col, column) in shape.columns.iter().enumerate() {
        let col = col as u16;
        sheet.write_with_format(0, col, column.label.as_str(), &formats.header)?;
        sheet.set_column_width(col, column.sheet_width)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (r, cells) in shape.rows.iter().enumerate() {
        let row = r as u32 + 1;
        for (c, cell) in cells.iter().enumerate() {
            let format = match shape.columns.get(c).map(|col| col.role) {
                Some(ColumnRole::Identity) => &formats.text,
                _ => &formats.centered,
            };
            let col = c as u16;
            match cell {
                Cell::Text(s) => sheet.write_with_format(row, col, s.as_str(), format)?,
                Cell::Number(v) => sheet.write_with_format(row, col, *v, format)?,
                Cell::Missing => sheet.write_with_format(row, col, cell.display(), format)?,
            };
        }
    }
    debug!("sheet {:?}: {} rows", name, shape.rows.len());
    Ok(())
}
