//! ReportRenderer - Snapshot Annotation and Text Report Images
//!
//! Pure formatting helpers used by the event log and the export view:
//!
//! - Outline detected objects on a captured frame (JPEG out)
//! - Synthesize an SVG "report card" image from text

use crate::analysis_dispatcher::DetectedObject;
use crate::error::{Error, Result};
use crate::snapshot_service::ImagePayload;
use chrono::{DateTime, Utc};
use image::{Rgb, RgbImage};

/// JPEG quality for annotated snapshots
const SNAPSHOT_JPEG_QUALITY: u8 = 85;

/// Report card geometry
const CARD_WIDTH: u32 = 640;
const CARD_WRAP_COLUMNS: usize = 64;
const CARD_LINE_HEIGHT: u32 = 22;
const CARD_HEADER_HEIGHT: u32 = 118;

/// Escape text for HTML/XML content and attribute values
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn box_color(confidence: f64) -> Rgb<u8> {
    if confidence >= 0.75 {
        Rgb([230, 57, 70])
    } else if confidence >= 0.5 {
        Rgb([244, 162, 97])
    } else {
        Rgb([233, 196, 106])
    }
}

fn draw_outline(
    img: &mut RgbImage,
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
    thickness: u32,
    color: Rgb<u8>,
) {
    let (w, h) = img.dimensions();
    for t in 0..thickness {
        let top = (y0 + t).min(h - 1);
        let bottom = y1.saturating_sub(t).max(y0);
        let left = (x0 + t).min(w - 1);
        let right = x1.saturating_sub(t).max(x0);
        for x in x0..=x1 {
            img.put_pixel(x, top, color);
            img.put_pixel(x, bottom, color);
        }
        for y in y0..=y1 {
            img.put_pixel(left, y, color);
            img.put_pixel(right, y, color);
        }
    }
}

/// Outline every object's bounding box on the frame
pub fn annotate_frame(frame: &ImagePayload, objects: &[DetectedObject]) -> Result<ImagePayload> {
    let decoded = image::load_from_memory(&frame.data)
        .map_err(|e| Error::Internal(format!("frame decode failed: {}", e)))?;
    let mut rgb = decoded.to_rgb8();
    let (w, h) = rgb.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::Internal("frame has no pixels".to_string()));
    }

    let thickness = (w.min(h) / 160).max(2);
    let to_px = |v: f64, extent: u32| ((v * extent as f64).round() as u32).min(extent - 1);

    for obj in objects {
        let b = &obj.bounding_box;
        draw_outline(
            &mut rgb,
            to_px(b.x_min, w),
            to_px(b.y_min, h),
            to_px(b.x_max, w),
            to_px(b.y_max, h),
            thickness,
            box_color(obj.confidence),
        );
    }

    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, SNAPSHOT_JPEG_QUALITY)
        .encode(rgb.as_raw(), w, h, image::ColorType::Rgb8.into())
        .map_err(|e| Error::Internal(format!("snapshot encode failed: {}", e)))?;

    Ok(ImagePayload::jpeg(out))
}

/// Greedy word wrap; words longer than a line are split
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            while word.chars().count() > columns {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let head: String = word.chars().take(columns).collect();
                word = word.chars().skip(columns).collect();
                lines.push(head);
            }
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > columns && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }
    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines
}

/// Text report rendered as an image
pub struct ReportCard<'a> {
    pub title: &'a str,
    pub location: &'a str,
    pub timestamp: DateTime<Utc>,
    pub body: &'a str,
}

/// Render a report card as an SVG image
pub fn render_report_card(card: &ReportCard<'_>) -> ImagePayload {
    let lines = wrap_text(card.body, CARD_WRAP_COLUMNS);
    let height = CARD_HEADER_HEIGHT + CARD_LINE_HEIGHT * lines.len().max(1) as u32 + 24;

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\
<rect width=\"100%\" height=\"100%\" fill=\"#0b1320\"/>\
<rect x=\"0\" y=\"0\" width=\"{w}\" height=\"6\" fill=\"#e63946\"/>\
<text x=\"24\" y=\"44\" font-family=\"monospace\" font-size=\"22\" font-weight=\"bold\" fill=\"#f1faee\">{title}</text>\
<text x=\"24\" y=\"72\" font-family=\"monospace\" font-size=\"14\" fill=\"#a8dadc\">{location}</text>\
<text x=\"24\" y=\"92\" font-family=\"monospace\" font-size=\"14\" fill=\"#a8dadc\">{stamp}</text>",
        w = CARD_WIDTH,
        h = height,
        title = escape_markup(card.title),
        location = escape_markup(card.location),
        stamp = card.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    for (i, line) in lines.iter().enumerate() {
        let y = CARD_HEADER_HEIGHT + CARD_LINE_HEIGHT * i as u32;
        svg.push_str(&format!(
            "<text x=\"24\" y=\"{}\" font-family=\"monospace\" font-size=\"15\" fill=\"#f1faee\">{}</text>",
            y,
            escape_markup(line)
        ));
    }
    svg.push_str("</svg>");

    ImagePayload::new("image/svg+xml", svg.into_bytes())
}
