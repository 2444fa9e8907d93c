//! # Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! [chunks]
//! capacity_floor = 8
//! growth_factor = 2
//!
//! [character]
//! passes = ["CharacterShadow", "CharacterOutline"]
//!
//! [decal]
//! pass = "DecalProjector"
//! default_draw_distance = 1000.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use umbra_core::{GrowthPolicy, DEFAULT_CAPACITY_FLOOR, DEFAULT_GROWTH_FACTOR};

use crate::error::{UmbraError, UmbraResult};

/// Chunk growth settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Capacity of a chunk after its first growth.
    pub capacity_floor: usize,
    /// Capacity multiplier when a chunk is full.
    pub growth_factor: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            capacity_floor: DEFAULT_CAPACITY_FLOOR,
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }
}

impl GrowthConfig {
    /// Converts to the core growth policy.
    ///
    /// Only call on a validated configuration.
    #[must_use]
    pub fn policy(&self) -> GrowthPolicy {
        GrowthPolicy::new(self.capacity_floor, self.growth_factor)
    }
}

/// Character subsystem settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Named material passes, one draw-call chunk per pass per character.
    pub passes: Vec<String>,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            passes: vec!["CharacterShadow".to_string(), "CharacterOutline".to_string()],
        }
    }
}

/// Decal subsystem settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecalConfig {
    /// Named material pass used to draw decals.
    pub pass: String,
    /// Draw distance for decals that do not set a positive one.
    pub default_draw_distance: f32,
}

impl Default for DecalConfig {
    fn default() -> Self {
        Self {
            pass: "DecalProjector".to_string(),
            default_draw_distance: 1000.0,
        }
    }
}

/// Complete UMBRA configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UmbraConfig {
    /// Chunk growth.
    pub chunks: GrowthConfig,
    /// Character subsystem.
    pub character: CharacterConfig,
    /// Decal subsystem.
    pub decal: DecalConfig,
}

impl UmbraConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::ConfigParse`] on malformed TOML and
    /// [`UmbraError::InvalidConfig`] when a constraint is violated.
    pub fn from_toml_str(source: &str) -> UmbraResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::ConfigIo`] if the file cannot be read, plus the
    /// errors of [`UmbraConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> UmbraResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| UmbraError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks every constraint.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::InvalidConfig`] naming the first violation.
    pub fn validate(&self) -> UmbraResult<()> {
        if self.chunks.capacity_floor == 0 {
            return Err(UmbraError::InvalidConfig(
                "chunks.capacity_floor must be greater than zero".to_string(),
            ));
        }
        if self.chunks.growth_factor < 2 {
            return Err(UmbraError::InvalidConfig(format!(
                "chunks.growth_factor must be at least 2, got {}",
                self.chunks.growth_factor
            )));
        }
        if self.character.passes.is_empty() {
            return Err(UmbraError::InvalidConfig(
                "character.passes must name at least one pass".to_string(),
            ));
        }
        if self.character.passes.iter().any(String::is_empty) {
            return Err(UmbraError::InvalidConfig(
                "character.passes must not contain empty names".to_string(),
            ));
        }
        if self.decal.pass.is_empty() {
            return Err(UmbraError::InvalidConfig("decal.pass must not be empty".to_string()));
        }
        if self.decal.default_draw_distance.is_nan() || self.decal.default_draw_distance <= 0.0 {
            return Err(UmbraError::InvalidConfig(format!(
                "decal.default_draw_distance must be positive, got {}",
                self.decal.default_draw_distance
            )));
        }
        Ok(())
    }
}
