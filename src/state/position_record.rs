//! Persisted widget position

use serde::{Deserialize, Serialize};

use super::coerce;

/// One of the four screen corners a position can be anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "top-left" => Some(Self::TopLeft),
            "top-right" => Some(Self::TopRight),
            "bottom-left" => Some(Self::BottomLeft),
            "bottom-right" => Some(Self::BottomRight),
            _ => None,
        }
    }

    pub fn is_right(self) -> bool {
        matches!(self, Self::TopRight | Self::BottomRight)
    }

    pub fn is_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::BottomRight)
    }
}

/// Where the widget sits, either raw or relative to a corner anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionRecord {
    #[serde(rename_all = "camelCase")]
    Anchored {
        corner: Corner,
        offset_x: f64,
        offset_y: f64,
    },
    Absolute { left: f64, top: f64 },
}

impl PositionRecord {
    /// Read a stored position, preferring the corner form
    pub fn from_stored(raw: &str) -> Option<Self> {
        let obj = coerce::parse_object(raw)?;
        if let Some(corner) = coerce::string(&obj, "corner").and_then(Corner::parse) {
            return Some(Self::Anchored {
                corner,
                offset_x: coerce::float(&obj, "offsetX").unwrap_or(0.0),
                offset_y: coerce::float(&obj, "offsetY").unwrap_or(0.0),
            });
        }
        Some(Self::Absolute {
            left: coerce::float(&obj, "left")?,
            top: coerce::float(&obj, "top")?,
        })
    }

    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
