//! Drawing seam between layout code and the PDF encoder. Coordinates are in
//! points with the origin at the top-left corner of the page; `y` grows
//! downwards and text is positioned by its baseline.

use super::decoration::LogoHandle;
use super::fonts::text_width;
use crate::export::error::DecorationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

pub trait Surface {
    fn size(&self) -> (f32, f32);
    fn text(&mut self, x: f32, y: f32, size: f32, style: FontStyle, text: &str);
    fn rule(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32);
    fn shade(&mut self, x: f32, y: f32, w: f32, h: f32, gray: f32);
    fn image(
        &mut self,
        logo: &LogoHandle,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    ) -> Result<(), DecorationError>;
}

/// A growing sequence of pages; drawing always targets the newest one.
pub trait Canvas {
    /// Appends a page and returns its running 1-based number.
    fn begin_page(&mut self) -> u32;
    fn page(&mut self) -> &mut dyn Surface;
    fn page_count(&self) -> u32;
}

pub fn text_in_box(
    surface: &mut dyn Surface,
    x: f32,
    width: f32,
    baseline: f32,
    size: f32,
    style: FontStyle,
    align: Align,
    text: &str,
) {
    let w = text_width(text, size, style);
    let left = match align {
        Align::Left => x,
        Align::Center => x + (width - w) / 2.0,
        Align::Right => x + width - w,
    };
    surface.text(left, baseline, size, style, text);
}
