//! Editor configuration
//!
//! Persisted as JSON next to the level files. Any load or parse failure
//! falls back to the defaults.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Tunable editor parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Grid snapping step in world units
    pub grid_step: f32,
    /// Radius for binding the pointer to a vertex, edge, or camera line
    pub snap_distance: f32,
    /// Rocket hit box (width, height)
    pub rocket_size: Vec2,
    /// Level flag hit box (width, height)
    pub flag_size: Vec2,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_step: GRID_STEP,
            snap_distance: SNAP_DISTANCE,
            rocket_size: Vec2::new(ROCKET_WIDTH, ROCKET_HEIGHT),
            flag_size: Vec2::new(FLAG_WIDTH, FLAG_HEIGHT),
        }
    }
}

impl EditorConfig {
    /// Load from a JSON file, falling back to defaults on any error
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    log::info!("loaded editor config from {}", path.display());
                    config
                }
                Err(err) => {
                    log::warn!("invalid editor config in {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("no editor config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        log::info!("saved editor config to {}", path.display());
        Ok(())
    }
}
