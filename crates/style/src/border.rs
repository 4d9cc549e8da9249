use crate::parsers;
use folio_types::Color;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    Double,
    None,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Border {
    pub width: f32,
    pub style: BorderStyle,
    pub color: Color,
}

impl Border {
    pub fn solid(width: f32, color: Color) -> Self {
        Self { width, style: BorderStyle::Solid, color }
    }

    pub fn none() -> Self {
        Self { width: 0.0, style: BorderStyle::None, color: Color::BLACK }
    }

    /// Width that actually takes up space; invisible borders take none.
    pub fn effective_width(&self) -> f32 {
        if self.style == BorderStyle::None { 0.0 } else { self.width.max(0.0) }
    }
}

impl Eq for Border {}

impl Hash for Border {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.width.to_bits().hash(state);
        self.style.hash(state);
        self.color.hash(state);
    }
}

impl<'de> Deserialize<'de> for Border {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum BorderDef {
            Str(String),
            Map {
                width: f32,
                #[serde(default)]
                style: BorderStyle,
                #[serde(default)]
                color: Color,
            },
        }

        match BorderDef::deserialize(deserializer)? {
            BorderDef::Str(s) => parsers::border(&s).map_err(de::Error::custom),
            BorderDef::Map { width, style, color } => Ok(Border { width, style, color }),
        }
    }
}
