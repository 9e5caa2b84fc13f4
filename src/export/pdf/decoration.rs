//! Header and footer chrome drawn on every page of a printable report.

use base64::Engine;
use image::RgbaImage;
use log::{trace, warn};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::canvas::{text_in_box, Align, FontStyle, Surface};
use crate::export::error::DecorationError;
use crate::report::model::ReportMetadata;

pub const MARGIN: f32 = 36.0;
pub const HEADER_BOTTOM: f32 = 74.0;
/// Distance from the bottom edge reserved for the footer band.
pub const FOOTER_HEIGHT: f32 = 48.0;

const LOGO_TOP: f32 = 18.0;
const LOGO_BOX: f32 = 40.0;
const TEXT_X: f32 = MARGIN + LOGO_BOX + 10.0;
const HEADER_RULE_Y: f32 = 66.0;

/// Object fields that may carry a logo, in priority order.
const LOGO_FIELDS: [&str; 9] = [
    "bytes",
    "data",
    "url",
    "secureUrl",
    "secure_url",
    "src",
    "href",
    "path",
    "uri",
];
/// Fields whose plain string value is base64 image data rather than a location.
const BYTE_FIELDS: [&str; 2] = ["bytes", "data"];

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedLogo {
    Bytes(Vec<u8>),
    RemoteUrl(String),
}

/// Resolve the loosely shaped logo reference into bytes or a location.
/// Arrays contribute their first element; a plain array of byte values is
/// taken as the image itself.
pub fn resolve_logo(reference: &Value) -> Result<Option<ResolvedLogo>, DecorationError> {
    match reference {
        Value::Null => Ok(None),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                Ok(Some(ResolvedLogo::RemoteUrl(s.to_string())))
            }
        }
        Value::Array(items) => {
            if let Some(bytes) = byte_array(items) {
                return Ok(Some(ResolvedLogo::Bytes(bytes)));
            }
            match items.first() {
                Some(first) => resolve_logo(first),
                None => Ok(None),
            }
        }
        Value::Object(obj) => {
            for field in LOGO_FIELDS {
                let Some(v) = obj.get(field).filter(|v| !v.is_null()) else {
                    continue;
                };
                if BYTE_FIELDS.contains(&field) {
                    if let Value::String(s) = v {
                        if !s.starts_with("data:") {
                            let bytes = base64::engine::general_purpose::STANDARD.decode(s.trim())?;
                            return Ok(Some(ResolvedLogo::Bytes(bytes)));
                        }
                    }
                }
                return resolve_logo(v);
            }
            Ok(None)
        }
        other => Err(DecorationError::Unsupported(other.to_string())),
    }
}

fn byte_array(items: &[Value]) -> Option<Vec<u8>> {
    if items.is_empty() || !items.iter().all(Value::is_number) {
        return None;
    }
    items
        .iter()
        .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

fn parse_data_uri(uri: &str) -> Result<Vec<u8>, DecorationError> {
    let Some((header, payload)) = uri.split_once(',') else {
        return Err(DecorationError::Unsupported("malformed data URI".to_string()));
    };
    if header.contains(";base64") {
        Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

fn load_location(location: &str) -> Result<Vec<u8>, DecorationError> {
    if location.starts_with("data:") {
        return parse_data_uri(location);
    }
    let lower = location.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Err(DecorationError::Remote(location.to_string()));
    }
    let path = location.strip_prefix("file://").unwrap_or(location);
    std::fs::read(path).map_err(|source| DecorationError::Read {
        path: path.to_string(),
        source,
    })
}

/// Decoded logo pixels for a single draw. Dropping the handle releases them.
pub struct LogoHandle {
    digest: [u8; 32],
    pixels: RgbaImage,
}

impl LogoHandle {
    pub fn open(logo: ResolvedLogo) -> Result<Self, DecorationError> {
        let bytes = match logo {
            ResolvedLogo::Bytes(b) => b,
            ResolvedLogo::RemoteUrl(location) => load_location(&location)?,
        };
        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        let pixels = image::load_from_memory(&bytes)?.to_rgba8();
        trace!("opened logo handle {}x{}", pixels.width(), pixels.height());
        Ok(Self { digest, pixels })
    }

    /// Content digest of the source bytes; identical logos share one embedded image.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Size that fits inside a `max` x `max` box keeping the aspect ratio.
    pub fn fit(&self, max: f32) -> (f32, f32) {
        let (w, h) = (self.pixels.width() as f32, self.pixels.height() as f32);
        if w <= 0.0 || h <= 0.0 {
            return (max, max);
        }
        let scale = (max / w).min(max / h);
        (w * scale, h * scale)
    }
}

impl Drop for LogoHandle {
    fn drop(&mut self) {
        trace!("released logo handle");
    }
}

/// Per-export chrome settings. Metadata values win over these defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDecoration {
    pub subtitle: String,
    pub generated_on: String,
    pub default_organization: String,
    pub default_logo: Option<Value>,
}

impl PageDecoration {
    pub fn organization_name<'a>(&'a self, metadata: &'a ReportMetadata) -> &'a str {
        let name = metadata.organization_name.trim();
        if name.is_empty() {
            self.default_organization.as_str()
        } else {
            name
        }
    }

    /// Draws the header band and returns the `y` just below it.
    pub fn draw_header(&self, surface: &mut dyn Surface, metadata: &ReportMetadata) -> f32 {
        let (width, _) = surface.size();

        let logo = metadata
            .logo_reference
            .as_ref()
            .filter(|v| !v.is_null())
            .or(self.default_logo.as_ref());
        if let Some(reference) = logo {
            if let Err(e) = draw_logo(surface, reference) {
                warn!("rendering without logo: {}", e);
            }
        }

        surface.text(
            TEXT_X,
            36.0,
            14.0,
            FontStyle::Bold,
            self.organization_name(metadata),
        );
        surface.text(TEXT_X, 50.0, 9.0, FontStyle::Regular, &self.subtitle);
        let stamp = format!("Generated: {}", self.generated_on);
        text_in_box(
            surface,
            MARGIN,
            width - 2.0 * MARGIN,
            36.0,
            9.0,
            FontStyle::Regular,
            Align::Right,
            &stamp,
        );
        surface.rule(MARGIN, HEADER_RULE_Y, width - MARGIN, HEADER_RULE_Y, 0.6);
        HEADER_BOTTOM
    }

    pub fn draw_footer(&self, surface: &mut dyn Surface, page_number: u32, organization_name: &str) {
        let (width, height) = surface.size();
        let rule_y = height - FOOTER_HEIGHT + 8.0;
        let baseline = height - FOOTER_HEIGHT + 22.0;
        surface.rule(MARGIN, rule_y, width - MARGIN, rule_y, 0.4);

        let left = if self.subtitle.is_empty() {
            organization_name.to_string()
        } else {
            format!("{} | {}", organization_name, self.subtitle)
        };
        surface.text(MARGIN, baseline, 8.0, FontStyle::Regular, &left);
        text_in_box(
            surface,
            MARGIN,
            width - 2.0 * MARGIN,
            baseline,
            8.0,
            FontStyle::Regular,
            Align::Right,
            &format!("Page {}", page_number),
        );
    }
}

fn draw_logo(surface: &mut dyn Surface, reference: &Value) -> Result<(), DecorationError> {
    let Some(resolved) = resolve_logo(reference)? else {
        return Ok(());
    };
    let handle = LogoHandle::open(resolved)?;
    let (w, h) = handle.fit(LOGO_BOX);
    let drawn = surface.image(&handle, MARGIN, LOGO_TOP + (LOGO_BOX - h) / 2.0, w, h);
    drop(handle);
    drawn
}
