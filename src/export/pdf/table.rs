use log::debug;

use super::canvas::{text_in_box, Align, Canvas, FontStyle, Surface};
use super::fonts::wrap;

const HEADER_SHADE: f32 = 0.85;
const STRIPE_SHADE: f32 = 0.95;

#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub x: f32,
    pub widths: Vec<f32>,
    pub aligns: Vec<Align>,
    pub font_size: f32,
    pub line_height: f32,
    pub padding: f32,
    /// Cells wrap to at most this many lines; the last one is ellipsized.
    pub max_lines: usize,
    /// Lowest `y` a row may reach before the page breaks.
    pub bottom: f32,
}

impl TableLayout {
    pub fn width(&self) -> f32 {
        self.widths.iter().sum()
    }

    fn align(&self, col: usize) -> Align {
        self.aligns.get(col).copied().unwrap_or(Align::Left)
    }

    fn wrap_cells(&self, cells: &[String], style: FontStyle) -> Vec<Vec<String>> {
        cells
            .iter()
            .enumerate()
            .map(|(col, text)| {
                let width = self.widths.get(col).copied().unwrap_or(0.0);
                let inner = (width - 2.0 * self.padding).max(1.0);
                wrap(text, inner, self.font_size, style, self.max_lines)
            })
            .collect()
    }

    fn row_height(&self, lines: &[Vec<String>]) -> f32 {
        let count = lines.iter().map(Vec::len).max().unwrap_or(1).max(1);
        count as f32 * self.line_height + 2.0 * self.padding
    }
}

/// Where the table ended: last page used and the `y` under its last row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableEnd {
    pub page: u32,
    pub y: f32,
}

/// Paints `rows` under `header` starting at `top` on the canvas's current
/// page. A row that does not fit above `layout.bottom` moves to a new page:
/// the canvas appends one, `on_new_page` redraws the page chrome and returns
/// the `y` to resume at, and the header row is repeated. Rows are never
/// split and the hook runs exactly once per page it causes.
pub fn paint_table<F>(
    canvas: &mut dyn Canvas,
    header: &[String],
    rows: &[Vec<String>],
    layout: &TableLayout,
    top: f32,
    mut on_new_page: F,
) -> TableEnd
where
    F: FnMut(&mut dyn Surface, u32) -> f32,
{
    let header_lines = layout.wrap_cells(header, FontStyle::Bold);
    let header_height = layout.row_height(&header_lines);
    let mut page = canvas.page_count();
    let mut y = top;

    let mut break_page = |canvas: &mut dyn Canvas, page: &mut u32| -> f32 {
        *page = canvas.begin_page();
        debug!("table continues on page {}", page);
        on_new_page(canvas.page(), *page)
    };

    let first_height = rows
        .first()
        .map(|r| layout.row_height(&layout.wrap_cells(r, FontStyle::Regular)))
        .unwrap_or(0.0);
    if y + header_height + first_height > layout.bottom {
        y = break_page(canvas, &mut page);
    }
    y = paint_row(canvas.page(), layout, &header_lines, y, header_height, Some(HEADER_SHADE), FontStyle::Bold);

    let mut rows_on_page = 0usize;
    for (idx, row) in rows.iter().enumerate() {
        let lines = layout.wrap_cells(row, FontStyle::Regular);
        let height = layout.row_height(&lines);
        if rows_on_page > 0 && y + height > layout.bottom {
            y = break_page(canvas, &mut page);
            y = paint_row(canvas.page(), layout, &header_lines, y, header_height, Some(HEADER_SHADE), FontStyle::Bold);
            rows_on_page = 0;
        }
        let shade = (idx % 2 == 1).then_some(STRIPE_SHADE);
        y = paint_row(canvas.page(), layout, &lines, y, height, shade, FontStyle::Regular);
        rows_on_page += 1;
    }

    TableEnd { page, y }
}

fn paint_row(
    surface: &mut dyn Surface,
    layout: &TableLayout,
    lines: &[Vec<String>],
    y: f32,
    height: f32,
    shade: Option<f32>,
    style: FontStyle,
) -> f32 {
    let width = layout.width();
    if let Some(gray) = shade {
        surface.shade(layout.x, y, width, height, gray);
    }
    let mut x = layout.x;
    for (col, cell) in lines.iter().enumerate() {
        let col_width = layout.widths.get(col).copied().unwrap_or(0.0);
        let inner_x = x + layout.padding;
        let inner_width = col_width - 2.0 * layout.padding;
        for (n, line) in cell.iter().enumerate() {
            let baseline = y + layout.padding + layout.font_size + n as f32 * layout.line_height;
            text_in_box(
                surface,
                inner_x,
                inner_width,
                baseline,
                layout.font_size,
                style,
                layout.align(col),
                line,
            );
        }
        x += col_width;
    }
    let bottom = y + height;
    surface.rule(layout.x, bottom, layout.x + width, bottom, 0.3);
    bottom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::pdf::canvas::recording::{Op, RecordingCanvas};

    fn layout(bottom: f32) -> TableLayout {
        TableLayout {
            x: 36.0,
            widths: vec![20.0, 120.0, 60.0],
            aligns: vec![Align::Right, Align::Left, Align::Center],
            font_size: 8.0,
            line_height: 10.0,
            padding: 3.0,
            max_lines: 4,
            bottom,
        }
    }

    fn header() -> Vec<String> {
        vec!["#".into(), "Name".into(), "Math".into()]
    }

    fn rows(n: usize) -> Vec<Vec<String>> {
        (1..=n)
            .map(|i| vec![i.to_string(), format!("Student {}", i), "80".into()])
            .collect()
    }

    #[test]
    fn breaks_pages_and_repeats_header() {
        let mut canvas = RecordingCanvas::new(300.0, 200.0);
        canvas.begin_page();
        let mut hook_calls = Vec::new();
        // Header and rows are 16pt tall: 50..180 fits the header plus 7 rows.
        let end = paint_table(&mut canvas, &header(), &rows(20), &layout(180.0), 50.0, |_, page| {
            hook_calls.push(page);
            50.0
        });

        assert_eq!(canvas.pages.len(), 3);
        assert_eq!(hook_calls, vec![2, 3]);
        assert_eq!(end.page, 3);
        for page in 0..3 {
            assert_eq!(canvas.texts(page).iter().filter(|t| **t == "Name").count(), 1);
        }
        let all = canvas.all_texts();
        let order: Vec<&str> = all.iter().copied().filter(|t| t.starts_with("Student")).collect();
        let expected: Vec<String> = (1..=20).map(|i| format!("Student {}", i)).collect();
        assert_eq!(order, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn rows_never_cross_the_bottom_margin() {
        let mut canvas = RecordingCanvas::new(300.0, 200.0);
        canvas.begin_page();
        let mut long = rows(12);
        long[3][1] = "A very long name that needs several lines to fit in the cell".into();
        paint_table(&mut canvas, &header(), &long, &layout(180.0), 50.0, |_, _| 50.0);
        for page in &canvas.pages {
            for op in page {
                if let Op::Rule { y1, .. } = op {
                    assert!(*y1 <= 180.0 + 1e-3, "row bottom {} beyond margin", y1);
                }
            }
        }
    }

    #[test]
    fn starts_on_a_fresh_page_when_top_is_too_low() {
        let mut canvas = RecordingCanvas::new(300.0, 200.0);
        canvas.begin_page();
        let mut calls = 0;
        paint_table(&mut canvas, &header(), &rows(2), &layout(180.0), 170.0, |_, _| {
            calls += 1;
            40.0
        });
        assert_eq!(calls, 1);
        assert!(canvas.texts(0).is_empty());
        assert!(canvas.texts(1).contains(&"Name"));
    }

    #[test]
    fn alternate_rows_are_shaded() {
        let mut canvas = RecordingCanvas::new(300.0, 400.0);
        canvas.begin_page();
        paint_table(&mut canvas, &header(), &rows(4), &layout(380.0), 50.0, |_, _| 50.0);
        let shades = canvas.pages[0]
            .iter()
            .filter(|op| matches!(op, Op::Shade { .. }))
            .count();
        // header + rows 2 and 4
        assert_eq!(shades, 3);
    }
}
