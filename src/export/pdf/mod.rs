//! Paginated document output. Layout code draws onto a [`Canvas`]; the PDF
//! encoder is one implementation of it, the recording canvas used by the
//! tests is another.

pub mod canvas;
pub mod decoration;
pub mod document;
pub mod fonts;
pub mod table;

use log::{debug, info};

use self::canvas::{Align, Canvas, FontStyle, Surface};
use self::decoration::{PageDecoration, FOOTER_HEIGHT, MARGIN};
use self::document::PdfCanvas;
use self::fonts::ellipsize;
use self::table::{paint_table, TableLayout};
use crate::export::error::ExportError;
use crate::report::format::{format_average, format_mark};
use crate::report::model::{NormalizedReportRow, ReportMetadata, ReportSection};
use crate::report::shape::{ColumnRole, ReportColumns, ReportShape};

pub const DEFAULT_TITLE: &str = "Academic Report";

const INDEX_WIDTH: f32 = 24.0;
const MIN_FLEX_WIDTH: f32 = 28.0;
const FONT_SIZE: f32 = 8.0;
const LINE_HEIGHT: f32 = 10.0;
const CELL_PADDING: f32 = 3.0;
const MAX_CELL_LINES: usize = 4;
const TITLE_SIZE: f32 = 12.0;
const SUMMARY_SIZE: f32 = 9.0;
const SUMMARY_LINE: f32 = 12.0;

#[derive(Debug, Clone)]
pub struct DocumentOptions {
    pub decoration: PageDecoration,
    pub landscape: bool,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: u32,
}

pub fn to_document(
    rows: &[&NormalizedReportRow],
    columns: &ReportColumns,
    metadata: &ReportMetadata,
    options: &DocumentOptions,
) -> Result<RenderedDocument, ExportError> {
    let sections = [ReportSection {
        label: String::new(),
        rows: rows.to_vec(),
    }];
    render(&sections, columns, metadata, options, false)
}

/// One table per non-empty section, each section after the first on a
/// fresh page. Page numbers run across sections.
pub fn to_document_sections(
    sections: &[ReportSection<'_>],
    columns: &ReportColumns,
    metadata: &ReportMetadata,
    options: &DocumentOptions,
) -> Result<RenderedDocument, ExportError> {
    render(sections, columns, metadata, options, true)
}

fn render(
    sections: &[ReportSection<'_>],
    columns: &ReportColumns,
    metadata: &ReportMetadata,
    options: &DocumentOptions,
    labelled: bool,
) -> Result<RenderedDocument, ExportError> {
    if sections.iter().all(|s| s.rows.is_empty()) {
        return Err(ExportError::EmptyDataset);
    }
    let mut canvas = PdfCanvas::a4(options.landscape);
    let page_count = render_sections(&mut canvas, sections, columns, metadata, &options.decoration, labelled);
    let title = base_title(metadata);
    let author = options.decoration.organization_name(metadata).to_string();
    let bytes = canvas.finish(title, &author);
    info!("rendered document: {} pages, {} bytes", page_count, bytes.len());
    Ok(RenderedDocument { bytes, page_count })
}

pub fn base_title(metadata: &ReportMetadata) -> &str {
    let title = metadata.title.trim();
    if title.is_empty() {
        DEFAULT_TITLE
    } else {
        title
    }
}

fn section_title(metadata: &ReportMetadata, label: &str, labelled: bool) -> String {
    let base = base_title(metadata);
    if labelled && !label.trim().is_empty() {
        format!("{} - {}", base, label.trim())
    } else {
        base.to_string()
    }
}

/// Lays every non-empty section onto `canvas` and returns the page count.
pub(crate) fn render_sections(
    canvas: &mut dyn Canvas,
    sections: &[ReportSection<'_>],
    columns: &ReportColumns,
    metadata: &ReportMetadata,
    decoration: &PageDecoration,
    labelled: bool,
) -> u32 {
    let organization = decoration.organization_name(metadata).to_string();
    let (page_width, page_height) = {
        canvas.begin_page();
        canvas.page().size()
    };
    let mut first = true;

    for section in sections {
        if section.rows.is_empty() {
            debug!("skipping empty section {:?}", section.label);
            continue;
        }
        if !first {
            canvas.begin_page();
        }
        first = false;

        let title = section_title(metadata, &section.label, labelled);
        let shape = ReportShape::build(section.rows.iter().copied(), columns);
        let (header, body) = table_cells(&shape);
        let layout = table_layout(&shape, page_width, page_height);

        let page = canvas.page_count();
        let mut chrome = |surface: &mut dyn Surface, page: u32| -> f32 {
            draw_chrome(surface, decoration, metadata, &organization, &title, page)
        };
        let y = chrome(canvas.page(), page);
        let y = draw_summary(canvas.page(), metadata, columns, &section.rows, y);
        let end = paint_table(canvas, &header, &body, &layout, y, &mut chrome);
        debug!(
            "section {:?}: {} rows on pages {}..={}",
            section.label,
            body.len(),
            page,
            end.page
        );
    }
    canvas.page_count()
}

fn draw_chrome(
    surface: &mut dyn Surface,
    decoration: &PageDecoration,
    metadata: &ReportMetadata,
    organization: &str,
    title: &str,
    page: u32,
) -> f32 {
    let (width, _) = surface.size();
    let top = decoration.draw_header(surface, metadata);
    decoration.draw_footer(surface, page, organization);
    let title = ellipsize(title, width - 2.0 * MARGIN, TITLE_SIZE, FontStyle::Bold);
    surface.text(MARGIN, top + TITLE_SIZE + 2.0, TITLE_SIZE, FontStyle::Bold, &title);
    top + TITLE_SIZE + 12.0
}

/// Two columns of `label: value` lines: scope on the left, results on the
/// right. Returns the `y` below the taller column.
fn draw_summary(
    surface: &mut dyn Surface,
    metadata: &ReportMetadata,
    columns: &ReportColumns,
    rows: &[&NormalizedReportRow],
    top: f32,
) -> f32 {
    let (width, _) = surface.size();
    let mut left: Vec<(&str, String)> = Vec::new();
    for (label, value) in [
        ("Student", &metadata.student_label),
        ("Year", &metadata.year_label),
        ("Term", &metadata.term_label),
        ("Grade", &metadata.grade_label),
        ("Class", &metadata.class_label),
    ] {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            left.push((label, v.to_string()));
        }
    }

    let mut right: Vec<(&str, String)> = Vec::new();
    if let Some(exam) = metadata.exam_label.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        right.push(("Exam", exam.to_string()));
    }
    match rows {
        [single] => {
            right.push(("Average", format_average(single.average_of_marks)));
            right.push(("Position", format_mark(single.position)));
        }
        _ => {
            right.push(("Students", rows.len().to_string()));
            right.push(("Subjects", columns.subjects.len().to_string()));
            if columns.group_count() > 0 {
                right.push(("Groups", columns.group_count().to_string()));
            }
        }
    }

    let right_x = MARGIN + (width - 2.0 * MARGIN) / 2.0;
    for (n, (label, value)) in left.iter().enumerate() {
        let y = top + SUMMARY_SIZE + n as f32 * SUMMARY_LINE;
        surface.text(MARGIN, y, SUMMARY_SIZE, FontStyle::Regular, &format!("{}: {}", label, value));
    }
    for (n, (label, value)) in right.iter().enumerate() {
        let y = top + SUMMARY_SIZE + n as f32 * SUMMARY_LINE;
        surface.text(right_x, y, SUMMARY_SIZE, FontStyle::Regular, &format!("{}: {}", label, value));
    }
    let lines = left.len().max(right.len());
    top + lines as f32 * SUMMARY_LINE + 8.0
}

/// Header and body text with the leading `#` index column.
pub(crate) fn table_cells(shape: &ReportShape) -> (Vec<String>, Vec<Vec<String>>) {
    let mut header = vec!["#".to_string()];
    header.extend(shape.header().into_iter().map(str::to_string));
    let body = shape
        .rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let mut out = Vec::with_capacity(cells.len() + 1);
            out.push((i + 1).to_string());
            out.extend(cells.iter().map(|c| c.display()));
            out
        })
        .collect();
    (header, body)
}

/// Fixed columns keep their width, subject and group columns share what is
/// left; everything scales down when the page is too narrow.
fn table_layout(shape: &ReportShape, page_width: f32, page_height: f32) -> TableLayout {
    let available = page_width - 2.0 * MARGIN;
    let fixed: f32 = shape.columns.iter().filter_map(|c| c.page_width).sum();
    let flexible = shape.columns.iter().filter(|c| c.page_width.is_none()).count();
    let flex_width = if flexible == 0 {
        0.0
    } else {
        ((available - INDEX_WIDTH - fixed) / flexible as f32).max(MIN_FLEX_WIDTH)
    };

    let mut widths = vec![INDEX_WIDTH];
    widths.extend(shape.columns.iter().map(|c| c.page_width.unwrap_or(flex_width)));
    let total: f32 = widths.iter().sum();
    if total > available {
        let scale = available / total;
        widths.iter_mut().for_each(|w| *w *= scale);
    }

    let mut aligns = vec![Align::Right];
    aligns.extend(shape.columns.iter().map(|c| match c.role {
        ColumnRole::Identity => Align::Left,
        ColumnRole::Summary | ColumnRole::Subject | ColumnRole::Group => Align::Center,
    }));

    TableLayout {
        x: MARGIN,
        widths,
        aligns,
        font_size: FONT_SIZE,
        line_height: LINE_HEIGHT,
        padding: CELL_PADDING,
        max_lines: MAX_CELL_LINES,
        bottom: page_height - FOOTER_HEIGHT - 4.0,
    }
}
