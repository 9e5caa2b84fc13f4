use std::collections::HashMap;

use log::trace;
use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use super::canvas::{Canvas, FontStyle, Surface};
use super::decoration::LogoHandle;
use super::fonts::{self, encode_win_ansi};
use crate::export::error::DecorationError;

pub const A4_SHORT: f32 = 595.28;
pub const A4_LONG: f32 = 841.89;

struct EmbeddedImage {
    name: String,
    id: Ref,
}

/// Canvas backed by `pdf-writer`. Page content is buffered per page and
/// assembled into the document tree by [`PdfCanvas::finish`].
pub struct PdfCanvas {
    pdf: Pdf,
    next_id: i32,
    width: f32,
    height: f32,
    pages: Vec<Content>,
    images: HashMap<[u8; 32], EmbeddedImage>,
}

impl PdfCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            pdf: Pdf::new(),
            // 1 and 2 are the catalog and the page tree.
            next_id: 3,
            width,
            height,
            pages: Vec::new(),
            images: HashMap::new(),
        }
    }

    pub fn a4(landscape: bool) -> Self {
        if landscape {
            Self::new(A4_LONG, A4_SHORT)
        } else {
            Self::new(A4_SHORT, A4_LONG)
        }
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn flip(&self, y: f32) -> f32 {
        self.height - y
    }

    /// Embeds the logo once per distinct content digest and returns its resource name.
    fn embed(&mut self, logo: &LogoHandle) -> String {
        if let Some(existing) = self.images.get(logo.digest()) {
            return existing.name.clone();
        }
        let pixels = logo.pixels();
        let (w, h) = pixels.dimensions();
        let rgb: Vec<u8> = pixels.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect();
        let has_alpha = pixels.pixels().any(|p| p.0[3] < 255);

        let mask = if has_alpha {
            let alpha: Vec<u8> = pixels.pixels().map(|p| p.0[3]).collect();
            let mask_id = self.alloc();
            let compressed = compress_to_vec_zlib(&alpha, 6);
            let mut xobj = self.pdf.image_xobject(mask_id, &compressed);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w as i32);
            xobj.height(h as i32);
            xobj.color_space().device_gray();
            xobj.bits_per_component(8);
            Some(mask_id)
        } else {
            None
        };

        let id = self.alloc();
        let compressed = compress_to_vec_zlib(&rgb, 6);
        let mut xobj = self.pdf.image_xobject(id, &compressed);
        xobj.filter(Filter::FlateDecode);
        xobj.width(w as i32);
        xobj.height(h as i32);
        xobj.color_space().device_rgb();
        xobj.bits_per_component(8);
        if let Some(mask_id) = mask {
            xobj.s_mask(mask_id);
        }
        drop(xobj);

        let name = format!("Im{}", self.images.len() + 1);
        trace!("embedded logo as {} ({}x{})", name, w, h);
        self.images.insert(
            *logo.digest(),
            EmbeddedImage {
                name: name.clone(),
                id,
            },
        );
        name
    }

    pub fn finish(mut self, title: &str, author: &str) -> Vec<u8> {
        let catalog_id = Ref::new(1);
        let pages_id = Ref::new(2);
        let regular_id = self.alloc();
        let bold_id = self.alloc();
        let info_id = self.alloc();

        self.pdf
            .type1_font(regular_id)
            .base_font(Name(fonts::REGULAR_BASE_FONT))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        self.pdf
            .type1_font(bold_id)
            .base_font(Name(fonts::BOLD_BASE_FONT))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        let contents = std::mem::take(&mut self.pages);
        let mut page_ids = Vec::with_capacity(contents.len());
        for content in contents {
            let page_id = self.alloc();
            let content_id = self.alloc();
            let raw = content.finish();
            let compressed = compress_to_vec_zlib(&raw, 6);
            self.pdf
                .stream(content_id, &compressed)
                .filter(Filter::FlateDecode);
            page_ids.push((page_id, content_id));
        }

        let mut images: Vec<(&String, Ref)> =
            self.images.values().map(|img| (&img.name, img.id)).collect();
        images.sort_by(|a, b| a.0.cmp(b.0));

        self.pdf.catalog(catalog_id).pages(pages_id);
        self.pdf
            .pages(pages_id)
            .kids(page_ids.iter().map(|(page, _)| *page))
            .count(page_ids.len() as i32);

        for (page_id, content_id) in &page_ids {
            let mut page = self.pdf.page(*page_id);
            page.media_box(Rect::new(0.0, 0.0, self.width, self.height))
                .parent(pages_id)
                .contents(*content_id);
            let mut resources = page.resources();
            resources
                .fonts()
                .pair(Name(fonts::REGULAR_RESOURCE), regular_id)
                .pair(Name(fonts::BOLD_RESOURCE), bold_id);
            if !images.is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, id) in &images {
                    xobjects.pair(Name(name.as_bytes()), *id);
                }
            }
        }

        let mut info = self.pdf.document_info(info_id);
        info.title(TextStr(title));
        if !author.is_empty() {
            info.author(TextStr(author));
        }
        info.producer(TextStr(concat!("reportd ", env!("CARGO_PKG_VERSION"))));
        drop(info);

        self.pdf.finish()
    }
}

impl Surface for PdfCanvas {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn text(&mut self, x: f32, y: f32, size: f32, style: FontStyle, text: &str) {
        if text.is_empty() {
            return;
        }
        let y = self.flip(y);
        let encoded = encode_win_ansi(text);
        if let Some(content) = self.pages.last_mut() {
            content
                .begin_text()
                .set_font(Name(fonts::resource_name(style)), size)
                .next_line(x, y)
                .show(Str(&encoded))
                .end_text();
        }
    }

    fn rule(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        let (y1, y2) = (self.flip(y1), self.flip(y2));
        if let Some(content) = self.pages.last_mut() {
            content
                .set_line_width(width)
                .move_to(x1, y1)
                .line_to(x2, y2)
                .stroke();
        }
    }

    fn shade(&mut self, x: f32, y: f32, w: f32, h: f32, gray: f32) {
        let bottom = self.flip(y + h);
        if let Some(content) = self.pages.last_mut() {
            content
                .save_state()
                .set_fill_gray(gray)
                .rect(x, bottom, w, h)
                .fill_nonzero()
                .restore_state();
        }
    }

    fn image(
        &mut self,
        logo: &LogoHandle,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    ) -> Result<(), DecorationError> {
        if self.pages.is_empty() {
            return Ok(());
        }
        let name = self.embed(logo);
        let bottom = self.flip(y + h);
        if let Some(content) = self.pages.last_mut() {
            content
                .save_state()
                .transform([w, 0.0, 0.0, h, x, bottom])
                .x_object(Name(name.as_bytes()))
                .restore_state();
        }
        Ok(())
    }
}

impl Canvas for PdfCanvas {
    fn begin_page(&mut self) -> u32 {
        self.pages.push(Content::new());
        self.pages.len() as u32
    }

    fn page(&mut self) -> &mut dyn Surface {
        self
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }
}
