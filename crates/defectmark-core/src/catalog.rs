//! Defect type catalog.

use peniko::Color;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid color {0:?}: expected #rrggbb or #rrggbbaa")]
    InvalidColor(String),
    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// RGBA8 color stored as a `#rrggbb` / `#rrggbbaa` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
    pub fn parse(s: &str) -> Result<Self, CatalogError> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || CatalogError::InvalidColor(s.to_string());
        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    /// Same color with a replaced alpha channel.
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl From<HexColor> for Color {
    fn from(c: HexColor) -> Self {
        Color::from_rgba8(c.r, c.g, c.b, c.a)
    }
}

impl From<Color> for HexColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HexColor::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Neutral gray used when nothing better is known.
pub const DEFAULT_FALLBACK_COLOR: HexColor = HexColor::new(0x6b, 0x72, 0x80, 0xff);

/// A named, colored defect category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectType {
    pub id: String,
    pub name: String,
    pub color: HexColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DefectType {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: HexColor) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Read-only list of defect types supplied at session start.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectCatalog {
    types: Vec<DefectType>,
    fallback: HexColor,
}

impl Default for DefectCatalog {
    /// The standard surface-inspection categories.
    fn default() -> Self {
        Self::new(vec![
            DefectType::new("scratch", "Scratch", HexColor::new(0xef, 0x44, 0x44, 0xff))
                .with_description("Linear surface abrasion"),
            DefectType::new("dent", "Dent", HexColor::new(0xf9, 0x73, 0x16, 0xff))
                .with_description("Local surface deformation"),
            DefectType::new("crack", "Crack", HexColor::new(0xea, 0xb3, 0x08, 0xff))
                .with_description("Material fracture"),
            DefectType::new("discoloration", "Discoloration", HexColor::new(0x8b, 0x5c, 0xf6, 0xff))
                .with_description("Stain or color deviation"),
            DefectType::new("contamination", "Contamination", HexColor::new(0x10, 0xb9, 0x81, 0xff))
                .with_description("Foreign particle or residue"),
        ])
    }
}

impl DefectCatalog {
    pub fn new(types: Vec<DefectType>) -> Self {
        Self {
            types,
            fallback: DEFAULT_FALLBACK_COLOR,
        }
    }

    /// Parse a JSON array of defect types.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let types: Vec<DefectType> = serde_json::from_str(json)?;
        Ok(Self::new(types))
    }

    /// Replace the color used for unknown defect types.
    pub fn with_fallback(mut self, fallback: HexColor) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn get(&self, id: &str) -> Option<&DefectType> {
        self.types.iter().find(|t| t.id == id)
    }

    /// Color for a defect type id, or the fallback if the id is unknown.
    pub fn color_for(&self, id: &str) -> HexColor {
        self.get(id).map(|t| t.color).unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> HexColor {
        self.fallback
    }

    pub fn first(&self) -> Option<&DefectType> {
        self.types.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DefectType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
