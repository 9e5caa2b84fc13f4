//! Metrics for the two standard-14 faces the document uses. Widths are the
//! published AFM advance widths in 1/1000 em for code points 32..=126.

use super::canvas::FontStyle;

pub const REGULAR_RESOURCE: &[u8] = b"F1";
pub const BOLD_RESOURCE: &[u8] = b"F2";
pub const REGULAR_BASE_FONT: &[u8] = b"Helvetica";
pub const BOLD_BASE_FONT: &[u8] = b"Helvetica-Bold";

const FALLBACK_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

pub fn resource_name(style: FontStyle) -> &'static [u8] {
    match style {
        FontStyle::Regular => REGULAR_RESOURCE,
        FontStyle::Bold => BOLD_RESOURCE,
    }
}

fn char_width(ch: char, style: FontStyle) -> u16 {
    let table = match style {
        FontStyle::Regular => &HELVETICA,
        FontStyle::Bold => &HELVETICA_BOLD,
    };
    let code = ch as u32;
    if (32..=126).contains(&code) {
        table[(code - 32) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

pub fn text_width(text: &str, size: f32, style: FontStyle) -> f32 {
    let units: u32 = text.chars().map(|c| char_width(c, style) as u32).sum();
    units as f32 * size / 1000.0
}

/// Encode for the WinAnsi-encoded base fonts. Latin-1 maps straight through;
/// anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Truncate with a trailing `...` so the text fits `max_width`.
pub fn ellipsize(text: &str, max_width: f32, size: f32, style: FontStyle) -> String {
    if text_width(text, size, style) <= max_width {
        return text.to_string();
    }
    let dots = "...";
    let budget = max_width - text_width(dots, size, style);
    let mut out = String::new();
    let mut used = 0.0;
    for ch in text.chars() {
        let w = char_width(ch, style) as f32 * size / 1000.0;
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push_str(dots);
    out
}

/// Greedy word wrap into at most `max_lines` lines; the last line is
/// ellipsized when text remains. Words wider than a line are broken.
pub fn wrap(text: &str, max_width: f32, size: f32, style: FontStyle, max_lines: usize) -> Vec<String> {
    let max_lines = max_lines.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    let mut pieces: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        if text_width(word, size, style) <= max_width {
            pieces.push(word.to_string());
            continue;
        }
        let mut chunk = String::new();
        for ch in word.chars() {
            let mut candidate = chunk.clone();
            candidate.push(ch);
            if !chunk.is_empty() && text_width(&candidate, size, style) > max_width {
                pieces.push(std::mem::take(&mut chunk));
            }
            chunk.push(ch);
        }
        if !chunk.is_empty() {
            pieces.push(chunk);
        }
    }

    for piece in pieces {
        let candidate = if current.is_empty() {
            piece.clone()
        } else {
            format!("{} {}", current, piece)
        };
        if current.is_empty() || text_width(&candidate, size, style) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, piece));
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        let rest = lines.split_off(max_lines - 1).join(" ");
        lines.push(ellipsize(&rest, max_width, size, style));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_afm_tables() {
        assert!((text_width("A", 10.0, FontStyle::Regular) - 6.67).abs() < 1e-4);
        assert!((text_width("A", 10.0, FontStyle::Bold) - 7.22).abs() < 1e-4);
        assert!((text_width("il", 1000.0, FontStyle::Regular) - 444.0).abs() < 1e-3);
    }

    #[test]
    fn win_ansi_keeps_latin1_only() {
        assert_eq!(encode_win_ansi("Zoë"), vec![b'Z', b'o', 0xEB]);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn wrap_breaks_on_words_and_caps_lines() {
        let lines = wrap("Alexandra Catherine Montgomery-Smith", 60.0, 8.0, FontStyle::Regular, 4);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 8.0, FontStyle::Regular) <= 60.0 + 1e-3);
        }
        let capped = wrap("one two three four five six seven", 20.0, 8.0, FontStyle::Regular, 2);
        assert_eq!(capped.len(), 2);
        assert!(capped[1].ends_with("..."));
    }

    #[test]
    fn wrap_keeps_empty_text_as_one_line() {
        assert_eq!(wrap("", 50.0, 8.0, FontStyle::Regular, 3), vec![String::new()]);
    }
}
