//! Generation parameters
//!
//! `GenerationParams` is the one record every generator accepts. It is
//! serde-serializable because the network layer ships seed + params between
//! peers and relies on local regeneration instead of transmitting tiles.
//! Algorithm-specific knobs travel in the `custom` map so the shared contract
//! never widens; typed accessors validate entries and surface malformed
//! values as parameter errors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GenError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationParams {
    pub width: usize,
    pub height: usize,
    /// Zero-based depth within a multi-level dungeon.
    pub depth: usize,
    /// Difficulty in [0.0, 1.0]; scales hazards like boss-room placement.
    pub difficulty: f64,
    /// Genre/theme identifier handed through to downstream consumers.
    pub genre_id: String,
    /// Algorithm-specific knobs (e.g. `min_room_size`, `tree_density`).
    #[serde(default)]
    pub custom: HashMap<String, Value>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            width: 80,
            height: 50,
            depth: 0,
            difficulty: 0.5,
            genre_id: String::from("fantasy"),
            custom: HashMap::new(),
        }
    }
}

impl GenerationParams {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, ..Default::default() }
    }

    /// Reject non-positive dimensions before any generator runs.
    pub fn check_dimensions(&self) -> Result<(), GenError> {
        if self.width == 0 || self.height == 0 {
            return Err(GenError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Reject a difficulty outside [0.0, 1.0]; downstream probability rolls
    /// scale on it and must never see a value off the unit interval.
    pub fn check_difficulty(&self) -> Result<(), GenError> {
        if !(0.0..=1.0).contains(&self.difficulty) {
            return Err(GenError::InvalidParameters(format!(
                "difficulty {} outside [0.0, 1.0]",
                self.difficulty
            )));
        }
        Ok(())
    }

    /// Insert a custom knob (builder style).
    pub fn with_custom(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.custom.insert(key.to_string(), value.into());
        self
    }

    /// Read a float knob, falling back to `default` when absent.
    pub fn custom_f64(&self, key: &str, default: f64) -> Result<f64, GenError> {
        match self.custom.get(key) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| GenError::MalformedCustomParam {
                key: key.to_string(),
                reason: format!("expected a number, got {value}"),
            }),
        }
    }

    /// Read a non-negative integer knob, falling back to `default` when absent.
    pub fn custom_usize(&self, key: &str, default: usize) -> Result<usize, GenError> {
        match self.custom.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .map(|v| v as usize)
                .ok_or_else(|| GenError::MalformedCustomParam {
                    key: key.to_string(),
                    reason: format!("expected a non-negative integer, got {value}"),
                }),
        }
    }

    /// Read a probability knob and clamp-check it to [0, 1].
    pub fn custom_probability(&self, key: &str, default: f64) -> Result<f64, GenError> {
        let value = self.custom_f64(key, default)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(GenError::MalformedCustomParam {
                key: key.to_string(),
                reason: format!("probability {value} outside [0, 1]"),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dimension_check() {
        assert!(GenerationParams::new(40, 30).check_dimensions().is_ok());
        assert!(GenerationParams::new(0, 30).check_dimensions().is_err());
        assert!(GenerationParams::new(40, 0).check_dimensions().is_err());
    }

    #[test]
    fn test_difficulty_check() {
        let mut params = GenerationParams::new(40, 30);
        for d in [0.0, 0.5, 1.0] {
            params.difficulty = d;
            assert!(params.check_difficulty().is_ok());
        }
        for d in [-1.0, -0.01, 1.01, 2.0] {
            params.difficulty = d;
            assert!(matches!(
                params.check_difficulty(),
                Err(GenError::InvalidParameters(_))
            ));
        }
    }

    #[test]
    fn test_custom_accessors_with_defaults() {
        let params = GenerationParams::new(40, 30)
            .with_custom("min_room_size", 6)
            .with_custom("tree_density", 0.25);

        assert_eq!(params.custom_usize("min_room_size", 4).unwrap(), 6);
        assert_eq!(params.custom_usize("max_depth", 5).unwrap(), 5);
        assert_eq!(params.custom_f64("tree_density", 0.3).unwrap(), 0.25);
    }

    #[test]
    fn test_malformed_custom_entries_are_rejected() {
        let params = GenerationParams::new(40, 30)
            .with_custom("min_room_size", "four")
            .with_custom("water_chance", 1.5);

        assert!(matches!(
            params.custom_usize("min_room_size", 4),
            Err(GenError::MalformedCustomParam { .. })
        ));
        assert!(matches!(
            params.custom_probability("water_chance", 0.5),
            Err(GenError::MalformedCustomParam { .. })
        ));
    }

    #[test]
    fn test_params_round_trip_over_the_wire() {
        // The network layer serializes seed + params; peers must deserialize
        // to an identical record.
        let params = GenerationParams::new(60, 40).with_custom("clearing_count", 3);
        let wire = serde_json::to_string(&params).unwrap();
        let back: GenerationParams = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.width, 60);
        assert_eq!(back.custom.get("clearing_count"), Some(&json!(3)));
    }
}
