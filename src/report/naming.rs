use chrono::NaiveDateTime;
use std::collections::HashSet;

/// Used when a title slugs down to nothing.
pub const FALLBACK_SLUG: &str = "report";

/// Host limit for worksheet names.
pub const SHEET_NAME_LIMIT: usize = 31;

pub const DEFAULT_SHEET_NAME: &str = "Report";
pub const DEFAULT_SECTION_SHEET_NAME: &str = "Term";

const SHEET_NAME_FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Lower-case, collapse every run of characters outside `[a-z0-9]` into a
/// single `-`, trim `-` at both ends.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// File stem shared by the spreadsheet and the document:
/// `<title>[-<scope>...][-<timestamp>]`, every component slugged on its own.
pub fn file_stem(title: &str, scope: &[&str], generated_at: Option<NaiveDateTime>) -> String {
    let base = slugify(title);
    let mut parts: Vec<String> = vec![if base.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        base
    }];
    parts.extend(scope.iter().map(|s| slugify(s)).filter(|s| !s.is_empty()));
    if let Some(ts) = generated_at {
        parts.push(slugify(&ts.format("%Y-%m-%d %H%M").to_string()));
    }
    parts.join("-")
}

pub fn file_name(stem: &str, extension: &str) -> String {
    format!("{}.{}", stem, extension)
}

pub fn sanitize_sheet_name(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .filter(|c| !SHEET_NAME_FORBIDDEN.contains(c) && !c.is_control())
        .collect();
    let trimmed = cleaned.trim().trim_matches('\'').trim();
    trimmed.chars().take(SHEET_NAME_LIMIT).collect::<String>().trim_end().to_string()
}

/// Hands out unique worksheet names for one workbook. Uniqueness is
/// case-insensitive, matching the spreadsheet host.
#[derive(Debug)]
pub struct SheetNames {
    used: HashSet<String>,
}

impl SheetNames {
    pub fn new() -> Self {
        let mut used = HashSet::new();
        // Reserved by the host application.
        used.insert("history".to_string());
        Self { used }
    }

    pub fn claim(&mut self, label: &str, fallback: &str) -> String {
        let primary = sanitize_sheet_name(label);
        if !primary.is_empty() && self.try_take(&primary) {
            return primary;
        }
        let fallback = sanitize_sheet_name(fallback);
        let fallback = if fallback.is_empty() {
            DEFAULT_SHEET_NAME.to_string()
        } else {
            fallback
        };
        if self.try_take(&fallback) {
            return fallback;
        }
        let mut n = 2;
        loop {
            let suffix = format!(" ({})", n);
            let keep = SHEET_NAME_LIMIT.saturating_sub(suffix.chars().count());
            let base: String = fallback.chars().take(keep).collect();
            let candidate = format!("{}{}", base.trim_end(), suffix);
            if self.try_take(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn try_take(&mut self, name: &str) -> bool {
        self.used.insert(name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn slugify_collapses_runs() {
        assert_eq!(slugify("Grade 10 A Report!"), "grade-10-a-report");
        assert_eq!(slugify("  --Term 1 // 2025--  "), "term-1-2025");
        assert_eq!(slugify("Élève Résumé"), "l-ve-r-sum");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn file_stem_joins_scope_and_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 5, 0))
            .expect("timestamp");
        assert_eq!(
            file_stem("Grade 10 A Report!", &["Math", "2025 / 26", "Term 1"], None),
            "grade-10-a-report-math-2025-26-term-1"
        );
        assert_eq!(
            file_stem("Daily Marks", &[], Some(ts)),
            "daily-marks-2025-03-14-0905"
        );
        assert_eq!(file_stem("???", &["", "**"], None), "report");
        assert_eq!(file_name("report", "xlsx"), "report.xlsx");
    }

    #[test]
    fn sheet_names_are_sanitized_and_truncated() {
        assert_eq!(sanitize_sheet_name("Term 1: Mid/Year [A]"), "Term 1 MidYear A");
        let long = "A very long sheet label that exceeds the limit";
        assert_eq!(sanitize_sheet_name(long).chars().count(), SHEET_NAME_LIMIT);
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
    }

    #[test]
    fn duplicate_and_empty_labels_fall_back() {
        let mut names = SheetNames::new();
        assert_eq!(names.claim("Term 1", "Term 1"), "Term 1");
        assert_eq!(names.claim("term 1", "Term 2"), "Term 2");
        assert_eq!(names.claim("", "Term 3"), "Term 3");
        assert_eq!(names.claim("***", "Term 3"), "Term 3 (2)");
        assert_eq!(names.claim("History", "Report"), "Report");
    }
}
