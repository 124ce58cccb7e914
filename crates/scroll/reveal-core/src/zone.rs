//! Scroll-position expressions for trigger zones.
//!
//! An edge is written `"<element> <viewport>"`, each side being an anchor
//! (`top`, `center`, `bottom`, `70%`, `120px`, `120`) with an optional relative
//! offset (`top-=40`, `center+=100`). The edge resolves to the scroll offset at
//! which the element-side point lines up with the viewport-side point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::document::Bounds;
use crate::error::RevealError;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Anchor {
    Top,
    Center,
    Bottom,
    Percent(f32),
    Px(f32),
}

impl Anchor {
    /// Distance of this anchor from the start of an extent of length `extent`.
    #[inline]
    pub fn resolve(self, extent: f32) -> f32 {
        match self {
            Anchor::Top => 0.0,
            Anchor::Center => extent * 0.5,
            Anchor::Bottom => extent,
            Anchor::Percent(p) => extent * p / 100.0,
            Anchor::Px(px) => px,
        }
    }
}

/// One anchor plus its relative offset in pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point {
    pub anchor: Anchor,
    pub offset: f32,
}

impl Point {
    #[inline]
    fn resolve(self, extent: f32) -> f32 {
        self.anchor.resolve(extent) + self.offset
    }
}

/// A single zone boundary (start or end).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ZoneEdge {
    pub element: Point,
    pub viewport: Point,
}

impl ZoneEdge {
    pub fn new(element: Anchor, viewport: Anchor) -> Self {
        Self {
            element: Point {
                anchor: element,
                offset: 0.0,
            },
            viewport: Point {
                anchor: viewport,
                offset: 0.0,
            },
        }
    }

    /// Scroll offset at which this edge is crossed for an element with `bounds`
    /// in a viewport `viewport_height` tall. Bounds are in document coordinates.
    pub fn resolve(&self, bounds: &Bounds, viewport_height: f32) -> f32 {
        bounds.top + self.element.resolve(bounds.height) - self.viewport.resolve(viewport_height)
    }
}

fn parse_number(raw: &str, expr: &str) -> Result<f32, RevealError> {
    let digits = raw.strip_suffix("px").unwrap_or(raw);
    digits.parse::<f32>().map_err(|_| RevealError::InvalidZone {
        expr: expr.to_string(),
        reason: format!("'{raw}' is not a number"),
    })
}

fn parse_anchor(raw: &str, expr: &str) -> Result<Anchor, RevealError> {
    match raw {
        "top" => Ok(Anchor::Top),
        "center" => Ok(Anchor::Center),
        "bottom" => Ok(Anchor::Bottom),
        _ => {
            if let Some(pct) = raw.strip_suffix('%') {
                let v = pct.parse::<f32>().map_err(|_| RevealError::InvalidZone {
                    expr: expr.to_string(),
                    reason: format!("'{raw}' is not a percentage"),
                })?;
                Ok(Anchor::Percent(v))
            } else {
                Ok(Anchor::Px(parse_number(raw, expr)?))
            }
        }
    }
}

fn parse_point(token: &str, expr: &str) -> Result<Point, RevealError> {
    let (anchor_raw, offset) = if let Some(idx) = token.find("+=") {
        (&token[..idx], parse_number(&token[idx + 2..], expr)?)
    } else if let Some(idx) = token.find("-=") {
        (&token[..idx], -parse_number(&token[idx + 2..], expr)?)
    } else {
        (token, 0.0)
    };
    if anchor_raw.is_empty() {
        return Err(RevealError::InvalidZone {
            expr: expr.to_string(),
            reason: "missing anchor".into(),
        });
    }
    Ok(Point {
        anchor: parse_anchor(anchor_raw, expr)?,
        offset,
    })
}

impl FromStr for ZoneEdge {
    type Err = RevealError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let mut parts = expr.split_whitespace();
        let (Some(el), Some(vp), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(RevealError::InvalidZone {
                expr: expr.to_string(),
                reason: "expected '<element> <viewport>'".into(),
            });
        };
        Ok(ZoneEdge {
            element: parse_point(el, expr)?,
            viewport: parse_point(vp, expr)?,
        })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.anchor {
            Anchor::Top => write!(f, "top")?,
            Anchor::Center => write!(f, "center")?,
            Anchor::Bottom => write!(f, "bottom")?,
            Anchor::Percent(p) => write!(f, "{p}%")?,
            Anchor::Px(px) => write!(f, "{px}px")?,
        }
        if self.offset > 0.0 {
            write!(f, "+={}", self.offset)
        } else if self.offset < 0.0 {
            write!(f, "-={}", -self.offset)
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for ZoneEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.element, self.viewport)
    }
}

impl Serialize for ZoneEdge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ZoneEdge {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
