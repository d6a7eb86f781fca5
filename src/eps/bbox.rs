//! Bounding box parsing and rewriting

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use super::{EpsError, Result};
use crate::crop::RelativeBBox;

static BBOX_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^%%(HiRes|Page)?BoundingBox:[ \t]*([^\r\n]*)").expect("valid regex")
});

/// PostScript bounding box in points, origin at lower left
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl BoundingBox {
    pub fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self { llx, lly, urx, ury }
    }

    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    /// Integer box enclosing this one (lower left floored, upper right ceiled)
    pub fn rounded_outward(&self) -> [i64; 4] {
        [
            self.llx.floor() as i64,
            self.lly.floor() as i64,
            self.urx.ceil() as i64,
            self.ury.ceil() as i64,
        ]
    }

    fn parse(values: &str) -> Option<Self> {
        let nums: Vec<f64> = values
            .split_whitespace()
            .map(str::parse)
            .collect::<std::result::Result<_, _>>()
            .ok()?;
        match nums.as_slice() {
            &[llx, lly, urx, ury] if urx >= llx && ury >= lly => Some(Self::new(llx, lly, urx, ury)),
            _ => None,
        }
    }
}

/// Read the document bounding box
///
/// `%%HiResBoundingBox` wins over `%%BoundingBox`; `(atend)` entries resolve
/// to the trailer occurrence. `%%PageBoundingBox` is ignored.
pub fn read_bbox(text: &str) -> Result<BoundingBox> {
    let mut integer = None;
    let mut hires = None;
    let mut malformed = None;

    for caps in BBOX_LINE.captures_iter(text) {
        let values = caps[2].trim();
        if values.starts_with("(atend)") {
            continue;
        }
        let slot = match caps.get(1).map(|m| m.as_str()) {
            Some("Page") => continue,
            Some(_) => &mut hires,
            None => &mut integer,
        };
        match BoundingBox::parse(values) {
            Some(bb) => {
                if slot.is_none() {
                    *slot = Some(bb);
                }
            }
            None => malformed = Some(values.to_string()),
        }
    }

    hires.or(integer).ok_or_else(|| match malformed {
        Some(values) => EpsError::InvalidBoundingBox(values),
        None => EpsError::MissingBoundingBox,
    })
}

/// Shrink a bounding box to a relative crop, then pad it by `padding_pt` points
///
/// Negative padding moves the edges inward; the box never inverts.
pub fn apply_relative_bbox(bbox: &BoundingBox, rel: &RelativeBBox, padding_pt: f64) -> BoundingBox {
    let (w, h) = (bbox.width(), bbox.height());

    let mut llx = bbox.llx + w * rel.left - padding_pt;
    let mut lly = bbox.lly + h * rel.bottom - padding_pt;
    let mut urx = bbox.llx + w * rel.right + padding_pt;
    let mut ury = bbox.lly + h * rel.top + padding_pt;

    if urx < llx {
        let mid = (llx + urx) / 2.0;
        llx = mid;
        urx = mid;
    }
    if ury < lly {
        let mid = (lly + ury) / 2.0;
        lly = mid;
        ury = mid;
    }

    BoundingBox::new(llx, lly, urx, ury)
}

/// Rewrite every bounding box comment in the document
pub fn write_bbox(text: &str, bbox: &BoundingBox) -> String {
    let [llx, lly, urx, ury] = bbox.rounded_outward();

    BBOX_LINE
        .replace_all(text, |caps: &Captures| match caps.get(1).map(|m| m.as_str()) {
            Some("HiRes") => format!(
                "%%HiResBoundingBox: {:.6} {:.6} {:.6} {:.6}",
                bbox.llx, bbox.lly, bbox.urx, bbox.ury
            ),
            Some(prefix) => format!("%%{}BoundingBox: {} {} {} {}", prefix, llx, lly, urx, ury),
            None => format!("%%BoundingBox: {} {} {} {}", llx, lly, urx, ury),
        })
        .into_owned()
}
