//! The fixed registry of artistic styles.
//!
//! [`StyleId`] values are the stable wire contract between the UI and
//! the engine; their string forms (`watercolor`, `starry-night`, ...)
//! never change. [`StyleCatalog`] lists the styles in display order and
//! resolves identifiers coming from outside the crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::EngineError;

/// Identifier of one artistic style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleId {
    /// Soft, flowing wash effects.
    Watercolor,
    /// Bold geometric abstraction.
    Udnie,
    /// Tiled glass texture.
    Mosaic,
    /// Dotted color distribution.
    Pointillism,
    /// Swirling flow patterns.
    StarryNight,
    /// Thick, textured brushstrokes.
    OilPainting,
}

impl StyleId {
    /// All styles in catalog order.
    pub const ALL: [Self; 6] = [
        Self::Watercolor,
        Self::Udnie,
        Self::Mosaic,
        Self::Pointillism,
        Self::StarryNight,
        Self::OilPainting,
    ];

    /// The wire identifier, e.g. `"starry-night"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Watercolor => "watercolor",
            Self::Udnie => "udnie",
            Self::Mosaic => "mosaic",
            Self::Pointillism => "pointillism",
            Self::StarryNight => "starry-night",
            Self::OilPainting => "oil-painting",
        }
    }
}

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| EngineError::UnsupportedStyle(s.to_string()))
    }
}

/// Display metadata for one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleDescriptor {
    /// Stable identifier.
    pub id: StyleId,
    /// Human-readable name.
    pub name: &'static str,
    /// One-line description for the style picker.
    pub description: &'static str,
}

const STYLES: [StyleDescriptor; 6] = [
    StyleDescriptor {
        id: StyleId::Watercolor,
        name: "Watercolor",
        description: "Soft, flowing wash effects",
    },
    StyleDescriptor {
        id: StyleId::Udnie,
        name: "Udnie (Cubism)",
        description: "Bold geometric abstraction",
    },
    StyleDescriptor {
        id: StyleId::Mosaic,
        name: "Mosaic",
        description: "Tiled glass texture",
    },
    StyleDescriptor {
        id: StyleId::Pointillism,
        name: "Pointillism",
        description: "Dotted color distribution",
    },
    StyleDescriptor {
        id: StyleId::StarryNight,
        name: "Starry Night",
        description: "Swirling flow patterns",
    },
    StyleDescriptor {
        id: StyleId::OilPainting,
        name: "Oil Painting",
        description: "Thick, textured brushstrokes",
    },
];

/// Read-only registry of the available styles.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleCatalog;

impl StyleCatalog {
    /// All styles in display order.
    #[must_use]
    pub const fn list() -> &'static [StyleDescriptor] {
        &STYLES
    }

    /// Look up a style by its wire identifier.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedStyle`] if `id` is not in the
    /// catalog.
    pub fn resolve(id: &str) -> Result<&'static StyleDescriptor, EngineError> {
        STYLES
            .iter()
            .find(|d| d.id.as_str() == id)
            .ok_or_else(|| EngineError::UnsupportedStyle(id.to_string()))
    }

    /// Metadata for an already-parsed identifier.
    #[must_use]
    pub fn describe(id: StyleId) -> &'static StyleDescriptor {
        // STYLES is indexed in StyleId::ALL order.
        &STYLES[id as usize]
    }
}
