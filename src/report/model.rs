use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder written wherever a mark, average or position is absent.
pub const SENTINEL: &str = "-";

/// Fields of a wrapped mark object that carry the numeric value, first present wins.
const MARK_VALUE_FIELDS: [&str; 3] = ["marks", "mark", "score"];

/// A single resolved mark. Input may be a bare number, an object with a
/// `marks` field, or anything else; all of that collapses into this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mark {
    Numeric(f64),
    Missing,
}

impl Mark {
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .map_or(Mark::Missing, Mark::Numeric),
            Some(Value::Object(obj)) => {
                let inner = MARK_VALUE_FIELDS
                    .iter()
                    .find_map(|k| obj.get(*k).filter(|v| !v.is_null()));
                match inner {
                    Some(v @ Value::Number(_)) => Mark::from_json(Some(v)),
                    _ => Mark::Missing,
                }
            }
            _ => Mark::Missing,
        }
    }
}

impl Serialize for Mark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Mark::Numeric(v) => serialize_number(*v, serializer),
            Mark::Missing => serializer.serialize_str(SENTINEL),
        }
    }
}

/// Integral values go out as JSON integers so `80` stays `80`, not `80.0`.
pub(crate) fn serialize_number<S: Serializer>(v: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        serializer.serialize_i64(v as i64)
    } else {
        serializer.serialize_f64(v)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDescriptor {
    #[serde(default)]
    pub id: Value,
    #[serde(alias = "name")]
    pub subject_name: String,
    #[serde(default)]
    pub subject_medium: Option<String>,
    #[serde(default)]
    pub is_basket_subject: bool,
    #[serde(default)]
    pub group: Option<String>,
}

#[cfg(test)]
impl SubjectDescriptor {
    pub fn core(name: &str) -> Self {
        Self {
            id: Value::Null,
            subject_name: name.to_string(),
            subject_medium: None,
            is_basket_subject: false,
            group: None,
        }
    }

    pub fn elective(name: &str, group: &str) -> Self {
        Self {
            id: Value::Null,
            subject_name: name.to_string(),
            subject_medium: None,
            is_basket_subject: true,
            group: Some(group.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketGroup {
    pub name: String,
    pub subjects: Vec<String>,
}

/// Subject descriptors split into core subjects and elective groups, both in
/// first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectCatalog {
    pub core: Vec<String>,
    pub groups: Vec<BasketGroup>,
}

impl SubjectCatalog {
    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedReportRow {
    pub id: String,
    pub admission_number: String,
    pub name: String,
    pub email: String,
    pub average_of_marks: Mark,
    pub position: Mark,
    pub subject_marks: BTreeMap<String, Mark>,
    pub group_marks: BTreeMap<String, Mark>,
    pub group_subjects: BTreeMap<String, Option<String>>,
}

impl NormalizedReportRow {
    pub fn subject_mark(&self, subject: &str) -> Mark {
        self.subject_marks
            .get(subject)
            .copied()
            .unwrap_or(Mark::Missing)
    }

    pub fn group_mark(&self, group: &str) -> Mark {
        self.group_marks.get(group).copied().unwrap_or(Mark::Missing)
    }

    pub fn group_subject(&self, group: &str) -> Option<&str> {
        self.group_subjects.get(group).and_then(|s| s.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportMetadata {
    pub title: String,
    pub organization_name: String,
    #[serde(alias = "logo")]
    pub logo_reference: Option<Value>,
    pub year_label: Option<String>,
    pub term_label: Option<String>,
    pub grade_label: Option<String>,
    pub class_label: Option<String>,
    pub subject_label: Option<String>,
    pub student_label: Option<String>,
    pub exam_label: Option<String>,
}

impl ReportMetadata {
    /// Scope components in the order they appear in derived file names.
    pub fn scope_labels(&self) -> Vec<&str> {
        [
            &self.subject_label,
            &self.grade_label,
            &self.class_label,
            &self.year_label,
            &self.term_label,
        ]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .filter(|v| !v.trim().is_empty())
        .collect()
    }
}

/// Elective selection per group. `None` (or an absent key) means no constraint.
pub type GroupFilterState = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportKind {
    #[default]
    ClassTerm,
    CoreOnly,
    Roster,
}

impl ReportKind {
    pub fn group_columns(self) -> bool {
        !matches!(self, ReportKind::CoreOnly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::ClassTerm => "classTerm",
            ReportKind::CoreOnly => "coreOnly",
            ReportKind::Roster => "roster",
        }
    }
}

/// One independently rendered sub-report (one sheet, one page group).
#[derive(Debug, Clone)]
pub struct ReportSection<'a> {
    pub label: String,
    pub rows: Vec<&'a NormalizedReportRow>,
}
