//! Catalogue of selectable text-generation models.
//!
//! Each [`ModelId`] trades latency against reasoning depth. The default is the
//! fastest variant.

use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

/// A backend model variant serving generation requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum ModelId {
    #[default]
    #[serde(rename = "gemini-flash-lite-latest")]
    FlashLite,
    #[serde(rename = "gemini-2.0-flash")]
    Flash20,
    #[serde(rename = "gemini-2.5-pro")]
    Pro25,
    #[serde(rename = "gemini-flash-latest")]
    FlashLatest,
    #[serde(rename = "gemini-3-pro-preview")]
    Pro3Preview,
}

impl ModelId {
    /// Every model, fastest first.
    pub const ALL: [ModelId; 5] = [
        ModelId::FlashLite,
        ModelId::Flash20,
        ModelId::Pro25,
        ModelId::FlashLatest,
        ModelId::Pro3Preview,
    ];

    /// The identifier sent to the generation service.
    pub fn id(self) -> &'static str {
        match self {
            ModelId::FlashLite => "gemini-flash-lite-latest",
            ModelId::Flash20 => "gemini-2.0-flash",
            ModelId::Pro25 => "gemini-2.5-pro",
            ModelId::FlashLatest => "gemini-flash-latest",
            ModelId::Pro3Preview => "gemini-3-pro-preview",
        }
    }

    /// A short human description of the latency/reasoning trade-off.
    pub fn label(self) -> &'static str {
        match self {
            ModelId::FlashLite => "Gemini Flash Lite (fastest, recommended)",
            ModelId::Flash20 => "Gemini 2.0 Flash (fast, stable)",
            ModelId::Pro25 => "Gemini 2.5 Pro (deeper reasoning)",
            ModelId::FlashLatest => "Gemini Flash (fast, newest)",
            ModelId::Pro3Preview => "Gemini 3 Pro Preview (maximum reasoning)",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Returned when a model identifier is not in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown model `{0}`")]
pub struct UnknownModel(String);

impl FromStr for ModelId {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|model| model.id() == s)
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}
