use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::model::{GroupFilterState, NormalizedReportRow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOptions {
    pub group: String,
    pub subjects: Vec<String>,
}

/// Selections that actually constrain rows. Null and blank selections are dropped.
pub fn active_selections(state: &GroupFilterState) -> Vec<(&str, &str)> {
    state
        .iter()
        .filter_map(|(group, sel)| {
            sel.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| (group.as_str(), s))
        })
        .collect()
}

pub fn row_matches(row: &NormalizedReportRow, selections: &[(&str, &str)]) -> bool {
    selections
        .iter()
        .all(|(group, subject)| row.group_subject(group) == Some(*subject))
}

/// Rows whose elective choices satisfy every active selection, in input order.
/// The rows themselves are borrowed, never copied or modified.
pub fn filter_rows<'a, I>(rows: I, state: &GroupFilterState) -> Vec<&'a NormalizedReportRow>
where
    I: IntoIterator<Item = &'a NormalizedReportRow>,
{
    let selections = active_selections(state);
    rows.into_iter()
        .filter(|row| row_matches(row, &selections))
        .collect()
}

/// Elective subjects actually chosen per group, for populating selectors.
pub fn group_subject_options<'a, I>(rows: I) -> Vec<GroupOptions>
where
    I: IntoIterator<Item = &'a NormalizedReportRow>,
{
    let mut by_group: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for row in rows {
        for (group, subject) in &row.group_subjects {
            let entry = by_group.entry(group.as_str()).or_default();
            if let Some(subject) = subject.as_deref() {
                entry.insert(subject);
            }
        }
    }
    by_group
        .into_iter()
        .map(|(group, subjects)| GroupOptions {
            group: group.to_string(),
            subjects: subjects.into_iter().map(str::to_string).collect(),
        })
        .collect()
}
