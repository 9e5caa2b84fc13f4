use serde::{Serialize, Serializer};

use super::format::{format_average, format_number};
use super::model::{
    serialize_number, Mark, NormalizedReportRow, ReportKind, SubjectCatalog, SENTINEL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnRole {
    Identity,
    Summary,
    Subject,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    AdmissionNumber,
    Name,
    Email,
    Average,
    Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub key: String,
    pub label: String,
    pub role: ColumnRole,
    /// Document width in points; `None` shares the remaining width.
    #[serde(skip)]
    pub page_width: Option<f32>,
    #[serde(skip)]
    pub sheet_width: f64,
}

/// One rendered cell. Both serializers paint exactly these values.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Missing,
}

impl Cell {
    fn from_mark(mark: Mark) -> Self {
        match mark {
            Mark::Numeric(v) => Cell::Number(v),
            Mark::Missing => Cell::Missing,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(v) => format_number(*v),
            Cell::Missing => SENTINEL.to_string(),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Number(v) => serialize_number(*v, serializer),
            Cell::Missing => serializer.serialize_str(SENTINEL),
        }
    }
}

/// Column set of one report: kind-specific fixed columns, then core
/// subjects, then groups when the kind enables them.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportColumns {
    pub kind: ReportKind,
    pub subjects: Vec<String>,
    pub groups: Vec<String>,
}

impl ReportColumns {
    pub fn new(kind: ReportKind, subjects: Vec<String>, groups: Vec<String>) -> Self {
        Self {
            kind,
            subjects,
            groups,
        }
    }

    pub fn from_catalog(kind: ReportKind, catalog: &SubjectCatalog) -> Self {
        Self::new(kind, catalog.core.clone(), catalog.group_names())
    }

    fn fixed_fields(&self) -> &'static [Field] {
        match self.kind {
            ReportKind::ClassTerm | ReportKind::CoreOnly => &[
                Field::AdmissionNumber,
                Field::Name,
                Field::Average,
                Field::Position,
            ],
            ReportKind::Roster => &[
                Field::AdmissionNumber,
                Field::Name,
                Field::Email,
                Field::Average,
                Field::Position,
            ],
        }
    }

    pub fn group_count(&self) -> usize {
        if self.kind.group_columns() {
            self.groups.len()
        } else {
            0
        }
    }

    pub fn columns(&self) -> Vec<Column> {
        let mut out: Vec<Column> = self.fixed_fields().iter().map(|f| fixed_column(*f)).collect();
        out.extend(self.subjects.iter().map(|s| Column {
            key: format!("subject:{}", s),
            label: s.clone(),
            role: ColumnRole::Subject,
            page_width: None,
            sheet_width: 12.0,
        }));
        if self.kind.group_columns() {
            out.extend(self.groups.iter().map(|g| Column {
                key: format!("group:{}", g),
                label: g.clone(),
                role: ColumnRole::Group,
                page_width: None,
                sheet_width: 14.0,
            }));
        }
        out
    }

    fn cells(&self, row: &NormalizedReportRow) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .fixed_fields()
            .iter()
            .map(|f| match f {
                Field::AdmissionNumber => Cell::Text(row.admission_number.clone()),
                Field::Name => Cell::Text(row.name.clone()),
                Field::Email if row.email.is_empty() => Cell::Missing,
                Field::Email => Cell::Text(row.email.clone()),
                Field::Average => match row.average_of_marks {
                    Mark::Numeric(_) => Cell::Text(format_average(row.average_of_marks)),
                    Mark::Missing => Cell::Missing,
                },
                Field::Position => Cell::from_mark(row.position),
            })
            .collect();
        cells.extend(self.subjects.iter().map(|s| Cell::from_mark(row.subject_mark(s))));
        if self.kind.group_columns() {
            cells.extend(self.groups.iter().map(|g| Cell::from_mark(row.group_mark(g))));
        }
        cells
    }
}

fn fixed_column(field: Field) -> Column {
    let (key, label, role, page_width, sheet_width) = match field {
        Field::AdmissionNumber => ("admissionNumber", "Admission No", ColumnRole::Identity, 64.0, 14.0),
        Field::Name => ("name", "Name", ColumnRole::Identity, 130.0, 28.0),
        Field::Email => ("email", "Email", ColumnRole::Identity, 140.0, 30.0),
        Field::Average => ("averageOfMarks", "Average", ColumnRole::Summary, 50.0, 10.0),
        Field::Position => ("position", "Position", ColumnRole::Summary, 46.0, 10.0),
    };
    Column {
        key: key.to_string(),
        label: label.to_string(),
        role,
        page_width: Some(page_width),
        sheet_width,
    }
}

/// Header plus rows of cells, built once and painted by both serializers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportShape {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportShape {
    pub fn build<'a, I>(rows: I, columns: &ReportColumns) -> Self
    where
        I: IntoIterator<Item = &'a NormalizedReportRow>,
    {
        Self {
            columns: columns.columns(),
            rows: rows.into_iter().map(|r| columns.cells(r)).collect(),
        }
    }

    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }
}
