//! Drawable entities shared between clients.

use kurbo::Point;
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque RGB color, carried on the wire as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }

    /// Parse `#rgb` or `#rrggbb`.
    pub fn parse(color: &str) -> Option<Self> {
        let hex = color.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => Some(Self::new(
                channel(&hex[0..1])? * 17,
                channel(&hex[1..2])? * 17,
                channel(&hex[2..3])? * 17,
            )),
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => None,
        }
    }

    /// Parse, falling back to black for anything unrecognized.
    pub fn parse_lossy(color: &str) -> Self {
        Self::parse(color).unwrap_or_else(|| {
            log::warn!("unrecognized color {color:?}, using black");
            Self::black()
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<String> for RgbColor {
    fn from(value: String) -> Self {
        Self::parse_lossy(&value)
    }
}

impl From<RgbColor> for String {
    fn from(value: RgbColor) -> Self {
        value.to_hex()
    }
}

impl From<RgbColor> for Color {
    fn from(color: RgbColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, 255)
    }
}

/// Wire form of an id before normalization. Older clients sent millisecond timestamps.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Integer(i64),
    Float(f64),
}

/// Globally unique identity of a text label or media object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh id such as `text-3f2c...`.
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<RawId> for ObjectId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => Self(s),
            RawId::Integer(n) => Self(n.to_string()),
            RawId::Float(f) => Self(f.to_string()),
        }
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One freehand segment in world space. Strokes have no identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub from: Point,
    pub to: Point,
    pub width: f64,
    pub color: RgbColor,
}

impl Stroke {
    pub fn new(from: Point, to: Point, width: f64, color: RgbColor) -> Self {
        Self { from, to, width, color }
    }
}

/// A positioned text label.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub id: ObjectId,
    pub content: String,
    /// Baseline origin in world space.
    pub position: Point,
    pub font_size: f64,
    /// Color used for drawing.
    pub color: RgbColor,
    /// The color string a peer sent when it was not `#rgb`/`#rrggbb`.
    /// It goes back on the wire unchanged so peers that understand it keep it.
    pub color_source: Option<String>,
}

impl TextLabel {
    pub fn new(content: impl Into<String>, position: Point, font_size: f64, color: RgbColor) -> Self {
        Self {
            id: ObjectId::generate("text"),
            content: content.into(),
            position,
            font_size,
            color,
            color_source: None,
        }
    }

    /// Adopt a color as received from the relay.
    pub fn set_wire_color(&mut self, raw: String) {
        match RgbColor::parse(&raw) {
            Some(color) => {
                self.color = color;
                self.color_source = None;
            }
            None => {
                log::warn!("unrecognized text color {raw:?}, drawing black");
                self.color = RgbColor::black();
                self.color_source = Some(raw);
            }
        }
    }

    /// Color as it should be sent to peers.
    pub fn wire_color(&self) -> String {
        self.color_source.clone().unwrap_or_else(|| self.color.to_hex())
    }
}

/// Kind of embedded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn name(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// An embedded image or video.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaObject {
    pub id: ObjectId,
    pub kind: MediaKind,
    /// Encoded source, usually a `data:` URL. Never changes after creation.
    pub source: String,
    /// Top-left corner in world space.
    pub position: Point,
    pub scale_factor: f64,
}

impl MediaObject {
    pub fn new(kind: MediaKind, source: impl Into<String>, position: Point, scale_factor: f64) -> Self {
        Self {
            id: ObjectId::generate(kind.name()),
            kind,
            source: source.into(),
            position,
            scale_factor,
        }
    }
}

/// Reference to a movable object in the scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    Text(ObjectId),
    Media(ObjectId),
}

impl ObjectRef {
    pub fn id(&self) -> &ObjectId {
        match self {
            ObjectRef::Text(id) | ObjectRef::Media(id) => id,
        }
    }
}

/// Current stroke and text settings used for new local content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Brush {
    /// Stroke width in world units.
    pub size: f64,
    /// Font size for new text labels.
    pub text_size: f64,
    pub color: RgbColor,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            size: 3.0,
            text_size: 24.0,
            color: RgbColor::black(),
        }
    }
}
