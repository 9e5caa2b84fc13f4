use log::warn;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

use super::model::{
    BasketGroup, Mark, NormalizedReportRow, SubjectCatalog, SubjectDescriptor, SENTINEL,
};

const ID_FIELDS: [&str; 3] = ["id", "_id", "studentId"];
const ADMISSION_FIELDS: [&str; 3] = ["admissionNumber", "admissionNo", "admission_number"];
const NAME_FIELDS: [&str; 3] = ["name", "fullName", "studentName"];
const EMAIL_FIELDS: [&str; 1] = ["email"];
const AVERAGE_FIELDS: [&str; 2] = ["averageOfMarks", "average"];
const POSITION_FIELDS: [&str; 2] = ["position", "rank"];
const MARKS_CONTAINER_FIELDS: [&str; 2] = ["marks", "subjectMarks"];
const GROUP_SUBJECT_FIELDS: [&str; 3] = ["subjectName", "subject", "name"];

/// A record that normalized with degraded identity columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordWarning {
    pub index: usize,
    pub record_id: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub catalog: SubjectCatalog,
    pub rows: Vec<NormalizedReportRow>,
    pub warnings: Vec<RecordWarning>,
}

pub fn partition_subjects(descriptors: &[SubjectDescriptor]) -> SubjectCatalog {
    let mut core: Vec<String> = Vec::new();
    let mut groups: Vec<BasketGroup> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for d in descriptors {
        let name = d.subject_name.trim();
        if name.is_empty() || !seen.insert(name.to_string()) {
            continue;
        }
        let group = d
            .group
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty());
        match (d.is_basket_subject, group) {
            (true, Some(group)) => match groups.iter_mut().find(|g| g.name == group) {
                Some(existing) => existing.subjects.push(name.to_string()),
                None => groups.push(BasketGroup {
                    name: group.to_string(),
                    subjects: vec![name.to_string()],
                }),
            },
            (true, None) => {
                warn!("basket subject {:?} has no group; treating it as core", name);
                core.push(name.to_string());
            }
            (false, _) => core.push(name.to_string()),
        }
    }

    SubjectCatalog { core, groups }
}

pub fn normalize(records: &[Value], descriptors: &[SubjectDescriptor]) -> Vec<NormalizedReportRow> {
    normalize_records(records, descriptors).rows
}

pub fn normalize_records(records: &[Value], descriptors: &[SubjectDescriptor]) -> Normalized {
    let catalog = partition_subjects(descriptors);
    let mut warnings = Vec::new();
    let rows = records
        .iter()
        .enumerate()
        .map(|(idx, record)| normalize_record(idx, record, &catalog, &mut warnings))
        .collect();
    Normalized {
        catalog,
        rows,
        warnings,
    }
}

fn normalize_record(
    idx: usize,
    record: &Value,
    catalog: &SubjectCatalog,
    warnings: &mut Vec<RecordWarning>,
) -> NormalizedReportRow {
    let empty = Map::new();
    let obj = record.as_object().unwrap_or(&empty);
    let student = obj.get("student").and_then(Value::as_object);

    let id = identity_text(obj, student, &ID_FIELDS).unwrap_or_else(|| idx.to_string());
    let admission_number = identity_text(obj, student, &ADMISSION_FIELDS);
    let name = identity_text(obj, student, &NAME_FIELDS).or_else(|| joined_name(obj, student));
    let email = identity_text(obj, student, &EMAIL_FIELDS).unwrap_or_default();

    let mut missing: Vec<&str> = Vec::new();
    if !record.is_object() {
        missing.push("record object");
    } else {
        if admission_number.is_none() {
            missing.push("admissionNumber");
        }
        if name.is_none() {
            missing.push("name");
        }
    }
    if !missing.is_empty() {
        let message = format!("missing {}", missing.join(", "));
        warn!("record {} ({}): {}", idx, id, message);
        warnings.push(RecordWarning {
            index: idx,
            record_id: id.clone(),
            message,
        });
    }

    let entry = marks_entry(obj);

    let average_of_marks = summary_mark(obj, entry, &AVERAGE_FIELDS);
    let position = summary_mark(obj, entry, &POSITION_FIELDS);

    let subject_marks: BTreeMap<String, Mark> = catalog
        .core
        .iter()
        .map(|subject| {
            let mark = Mark::from_json(entry.and_then(|e| e.subjects.get(subject)));
            (subject.clone(), mark)
        })
        .collect();

    let mut group_marks = BTreeMap::new();
    let mut group_subjects = BTreeMap::new();
    for group in &catalog.groups {
        let (subject, mark) = resolve_group(group, entry);
        group_marks.insert(group.name.clone(), mark);
        group_subjects.insert(group.name.clone(), subject);
    }

    NormalizedReportRow {
        id,
        admission_number: admission_number.unwrap_or_else(|| SENTINEL.to_string()),
        name: name.unwrap_or_else(|| SENTINEL.to_string()),
        email,
        average_of_marks,
        position,
        subject_marks,
        group_marks,
        group_subjects,
    }
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn identity_text(
    obj: &Map<String, Value>,
    student: Option<&Map<String, Value>>,
    fields: &[&str],
) -> Option<String> {
    let lookup = |m: &Map<String, Value>| fields.iter().find_map(|k| m.get(*k).and_then(text_value));
    lookup(obj).or_else(|| student.and_then(lookup))
}

fn joined_name(obj: &Map<String, Value>, student: Option<&Map<String, Value>>) -> Option<String> {
    let first = identity_text(obj, student, &["firstName"]);
    let last = identity_text(obj, student, &["lastName"]);
    match (first, last) {
        (Some(f), Some(l)) => Some(format!("{} {}", f, l)),
        (Some(f), None) => Some(f),
        (None, Some(l)) => Some(l),
        (None, None) => None,
    }
}

/// The marks sub-record of a student. Lists contribute their first element only.
#[derive(Clone, Copy)]
struct MarksEntry<'a> {
    /// The entry as given; may carry its own average and position.
    outer: &'a Map<String, Value>,
    /// Subject and group marks, one level deeper when the entry wraps them.
    subjects: &'a Map<String, Value>,
}

fn marks_entry(obj: &Map<String, Value>) -> Option<MarksEntry<'_>> {
    let container = MARKS_CONTAINER_FIELDS
        .iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))?;
    let outer = match container {
        Value::Array(items) => items.first()?.as_object()?,
        Value::Object(map) => map,
        _ => return None,
    };
    let subjects = MARKS_CONTAINER_FIELDS
        .iter()
        .find_map(|k| outer.get(*k).and_then(Value::as_object))
        .unwrap_or(outer);
    Some(MarksEntry { outer, subjects })
}

/// First non-null value of `fields` on the record, then on the marks entry,
/// then inside its wrapped subject map.
fn summary_mark(obj: &Map<String, Value>, entry: Option<MarksEntry<'_>>, fields: &[&str]) -> Mark {
    let value = first_present(obj, fields).or_else(|| {
        entry.and_then(|e| first_present(e.outer, fields).or_else(|| first_present(e.subjects, fields)))
    });
    Mark::from_json(value)
}

fn first_present<'a>(map: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields.iter().find_map(|k| map.get(*k).filter(|v| !v.is_null()))
}

fn resolve_group(group: &BasketGroup, entry: Option<MarksEntry<'_>>) -> (Option<String>, Mark) {
    let Some(marks) = entry.map(|e| e.subjects) else {
        return (None, Mark::Missing);
    };

    let scanned = || {
        group.subjects.iter().find_map(|subject| {
            marks
                .get(subject)
                .filter(|v| !v.is_null())
                .map(|v| (subject.clone(), Mark::from_json(Some(v))))
        })
    };

    match marks.get(&group.name) {
        Some(Value::Object(obj)) => {
            let subject = GROUP_SUBJECT_FIELDS
                .iter()
                .find_map(|k| obj.get(*k).and_then(text_value));
            let mark = Mark::from_json(marks.get(&group.name));
            match (subject, mark) {
                // A group object that only names the pick; the mark sits under the subject.
                (Some(subject), Mark::Missing) => {
                    let mark = Mark::from_json(marks.get(&subject));
                    (Some(subject), mark)
                }
                (Some(subject), mark) => (Some(subject), mark),
                (None, mark) => (scanned().map(|(s, _)| s), mark),
            }
        }
        Some(Value::String(s)) if !s.trim().is_empty() => {
            let subject = s.trim().to_string();
            let mark = Mark::from_json(marks.get(&subject));
            (Some(subject), mark)
        }
        _ => match scanned() {
            Some((subject, mark)) => (Some(subject), mark),
            None => (None, Mark::Missing),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subjects() -> Vec<SubjectDescriptor> {
        vec![
            SubjectDescriptor::core("Math"),
            SubjectDescriptor::core("Science"),
            SubjectDescriptor::elective("Art", "Group 1"),
            SubjectDescriptor::elective("Music", "Group 1"),
            SubjectDescriptor::elective("Commerce", "Group 2"),
            SubjectDescriptor::elective("Drama", "Group 2"),
        ]
    }

    #[test]
    fn end_to_end_example_row() {
        let records = vec![json!({
            "admissionNumber": "A001",
            "name": "J.Doe",
            "averageOfMarks": 76.555,
            "position": 1,
            "marks": [{ "Math": 80 }]
        })];
        let rows = normalize(
            &records,
            &[SubjectDescriptor::core("Math"), SubjectDescriptor::core("Science")],
        );
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.admission_number, "A001");
        assert_eq!(row.name, "J.Doe");
        assert_eq!(row.average_of_marks, Mark::Numeric(76.555));
        assert_eq!(row.position, Mark::Numeric(1.0));
        assert_eq!(row.subject_mark("Math"), Mark::Numeric(80.0));
        assert_eq!(row.subject_mark("Science"), Mark::Missing);
        assert!(row.group_marks.is_empty());
    }

    #[test]
    fn partition_keeps_order_and_buckets_electives() {
        let catalog = partition_subjects(&subjects());
        assert_eq!(catalog.core, vec!["Math", "Science"]);
        assert_eq!(catalog.group_names(), vec!["Group 1", "Group 2"]);
        assert_eq!(catalog.groups[0].subjects, vec!["Art", "Music"]);
    }

    #[test]
    fn partition_treats_ungrouped_basket_subject_as_core() {
        let mut loose = SubjectDescriptor::elective("Latin", "");
        loose.group = None;
        let catalog = partition_subjects(&[SubjectDescriptor::core("Math"), loose]);
        assert_eq!(catalog.core, vec!["Math", "Latin"]);
        assert!(catalog.groups.is_empty());
    }

    #[test]
    fn every_row_has_every_key() {
        let records = vec![
            json!({ "admissionNumber": "A1", "name": "One", "marks": [{ "Math": 50, "Art": 70 }] }),
            json!({ "admissionNumber": "A2", "name": "Two", "marks": [] }),
            json!({ "admissionNumber": "A3", "name": "Three" }),
        ];
        let rows = normalize(&records, &subjects());
        for row in &rows {
            let subject_keys: Vec<&String> = row.subject_marks.keys().collect();
            assert_eq!(subject_keys, vec!["Math", "Science"]);
            let group_keys: Vec<&String> = row.group_marks.keys().collect();
            assert_eq!(group_keys, vec!["Group 1", "Group 2"]);
            assert_eq!(row.group_subjects.len(), 2);
        }
        assert_eq!(rows[0].group_subject("Group 1"), Some("Art"));
        assert_eq!(rows[0].group_mark("Group 1"), Mark::Numeric(70.0));
        assert_eq!(rows[0].group_subject("Group 2"), None);
        assert_eq!(rows[1].subject_mark("Math"), Mark::Missing);
    }

    #[test]
    fn group_entry_object_supplies_choice_and_mark() {
        let records = vec![json!({
            "admissionNumber": "A1",
            "name": "One",
            "marks": [{
                "Group 1": { "subjectName": "Music", "marks": 64 },
                "Group 2": "Drama",
                "Drama": { "marks": 58 }
            }]
        })];
        let rows = normalize(&records, &subjects());
        assert_eq!(rows[0].group_subject("Group 1"), Some("Music"));
        assert_eq!(rows[0].group_mark("Group 1"), Mark::Numeric(64.0));
        assert_eq!(rows[0].group_subject("Group 2"), Some("Drama"));
        assert_eq!(rows[0].group_mark("Group 2"), Mark::Numeric(58.0));
    }

    #[test]
    fn only_first_marks_entry_is_used() {
        let records = vec![json!({
            "admissionNumber": "A1",
            "name": "One",
            "marks": [{ "Math": 40 }, { "Math": 99, "Science": 99 }]
        })];
        let rows = normalize(&records, &subjects());
        assert_eq!(rows[0].subject_mark("Math"), Mark::Numeric(40.0));
        assert_eq!(rows[0].subject_mark("Science"), Mark::Missing);
    }

    #[test]
    fn wrapped_entry_keeps_its_average_and_position() {
        let records = vec![json!({
            "admissionNumber": "A1",
            "name": "One",
            "marks": [{ "marks": { "Math": 80 }, "averageOfMarks": 76.5, "position": 2 }]
        })];
        let rows = normalize(&records, &subjects());
        assert_eq!(rows[0].subject_mark("Math"), Mark::Numeric(80.0));
        assert_eq!(rows[0].average_of_marks, Mark::Numeric(76.5));
        assert_eq!(rows[0].position, Mark::Numeric(2.0));
    }

    #[test]
    fn group_object_naming_only_the_subject_reads_the_subject_mark() {
        let records = vec![json!({
            "admissionNumber": "A1",
            "name": "One",
            "marks": [{ "Group 1": { "subjectName": "Music" }, "Music": 64 }]
        })];
        let rows = normalize(&records, &subjects());
        assert_eq!(rows[0].group_subject("Group 1"), Some("Music"));
        assert_eq!(rows[0].group_mark("Group 1"), Mark::Numeric(64.0));
    }

    #[test]
    fn bare_object_container_and_nested_identity() {
        let records = vec![json!({
            "student": { "admissionNo": 1042, "firstName": "Ada", "lastName": "Lee", "email": "ada@example.org" },
            "marks": { "Math": { "marks": 71 }, "averageOfMarks": 71, "position": 3 }
        })];
        let out = normalize_records(&records, &subjects());
        let row = &out.rows[0];
        assert_eq!(row.admission_number, "1042");
        assert_eq!(row.name, "Ada Lee");
        assert_eq!(row.email, "ada@example.org");
        assert_eq!(row.subject_mark("Math"), Mark::Numeric(71.0));
        assert_eq!(row.average_of_marks, Mark::Numeric(71.0));
        assert_eq!(row.position, Mark::Numeric(3.0));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn malformed_records_degrade_instead_of_failing() {
        let records = vec![
            json!({ "marks": [{ "Math": 12 }] }),
            json!("not a record"),
            json!({ "admissionNumber": "A3", "name": "Fine", "averageOfMarks": "n/a" }),
        ];
        let out = normalize_records(&records, &subjects());
        assert_eq!(out.rows.len(), 3);
        assert_eq!(out.rows[0].admission_number, "-");
        assert_eq!(out.rows[0].name, "-");
        assert_eq!(out.rows[0].email, "");
        assert_eq!(out.rows[0].subject_mark("Math"), Mark::Numeric(12.0));
        assert_eq!(out.rows[1].id, "1");
        assert_eq!(out.rows[2].average_of_marks, Mark::Missing);
        assert_eq!(out.warnings.len(), 2);
        assert_eq!(out.warnings[0].index, 0);
        assert_eq!(out.warnings[0].message, "missing admissionNumber, name");
        assert_eq!(out.warnings[1].message, "missing record object");
    }

    #[test]
    fn output_order_matches_input_order() {
        let records: Vec<Value> = (0..20)
            .rev()
            .map(|i| json!({ "admissionNumber": format!("A{:02}", i), "name": format!("S{}", i) }))
            .collect();
        let rows = normalize(&records, &subjects());
        let ids: Vec<&str> = rows.iter().map(|r| r.admission_number.as_str()).collect();
        let expected: Vec<String> = (0..20).rev().map(|i| format!("A{:02}", i)).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }
}
