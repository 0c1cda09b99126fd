//! Difficulty tiers and their tuning profiles
//!
//! A [`DifficultyProfile`] is resolved once when an agent is created and
//! held as an immutable snapshot for the agent's lifetime.

use crate::error::{AiError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use wraith_math::radians;

/// Difficulty tier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// All tiers, easiest first
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Resolve a numeric level (0 = Easy, 1 = Medium, 2 = Hard)
    pub fn from_level(level: i64) -> Result<Self> {
        match level {
            0 => Ok(Difficulty::Easy),
            1 => Ok(Difficulty::Medium),
            2 => Ok(Difficulty::Hard),
            other => Err(AiError::DifficultyLevelOutOfRange(other)),
        }
    }

    /// Numeric level of this tier
    pub fn level(self) -> u8 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    /// Tuning profile for this tier
    pub fn profile(self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => DifficultyProfile::easy(),
            Difficulty::Medium => DifficultyProfile::medium(),
            Difficulty::Hard => DifficultyProfile::hard(),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

impl FromStr for Difficulty {
    type Err = AiError;

    /// Accepts tier names in any case, or the numeric levels 0, 1 and 2
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(level) = trimmed.parse::<i64>() {
            return Self::from_level(level);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(AiError::UnknownDifficulty(s.to_string())),
        }
    }
}

/// Per-tier tuning values.
///
/// Distances are in world units, speeds in units per second and durations
/// in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyProfile {
    /// Movement speed while patrolling and searching
    pub walk_speed: f32,
    /// Movement speed while chasing
    pub chase_speed: f32,
    /// Movement speed while investigating
    pub investigate_speed: f32,
    /// Maximum sight distance
    pub detection_range: f32,
    /// Full field of view cone angle in degrees
    pub field_of_view: f32,
    /// Maximum hearing distance
    pub hearing_range: f32,
    /// Seconds a chase persists without sight
    pub chase_duration: f32,
    /// Seconds spent searching before returning to patrol
    pub search_duration: f32,
    /// Seconds spent distracted
    pub distraction_duration: f32,
    /// Stopping distance while chasing
    pub chase_stopping_distance: f32,
    /// Distance at which the target is captured
    pub kill_distance: f32,
    /// Distance at which the proximity warning is raised
    pub warning_range: f32,
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Self::medium()
    }
}

impl DifficultyProfile {
    /// Slow, short-sighted and forgiving
    pub fn easy() -> Self {
        Self {
            walk_speed: 2.5,
            chase_speed: 3.25,
            investigate_speed: 3.5,
            detection_range: 8.0,
            chase_duration: 5.0,
            chase_stopping_distance: 1.5,
            ..Self::medium()
        }
    }

    /// Baseline tuning
    pub fn medium() -> Self {
        Self {
            walk_speed: 4.0,
            chase_speed: 7.2,
            investigate_speed: 4.8,
            detection_range: 12.0,
            field_of_view: 120.0,
            hearing_range: 8.0,
            chase_duration: 7.5,
            search_duration: 5.0,
            distraction_duration: 3.0,
            chase_stopping_distance: 0.5,
            kill_distance: 0.75,
            warning_range: 3.0,
        }
    }

    /// Fast, far-sighted and persistent
    pub fn hard() -> Self {
        Self {
            walk_speed: 6.0,
            chase_speed: 10.8,
            investigate_speed: 7.2,
            detection_range: 15.0,
            chase_duration: 10.0,
            ..Self::medium()
        }
    }

    /// Half of the field of view, in radians
    pub fn half_fov_radians(&self) -> f32 {
        radians(self.field_of_view * 0.5)
    }

    /// Check every value is finite and in range
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("walk_speed", self.walk_speed),
            ("chase_speed", self.chase_speed),
            ("investigate_speed", self.investigate_speed),
            ("detection_range", self.detection_range),
            ("hearing_range", self.hearing_range),
            ("chase_duration", self.chase_duration),
            ("search_duration", self.search_duration),
            ("distraction_duration", self.distraction_duration),
            ("kill_distance", self.kill_distance),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(AiError::InvalidProfile { field, value });
            }
        }

        let non_negative = [
            ("chase_stopping_distance", self.chase_stopping_distance),
            ("warning_range", self.warning_range),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(AiError::InvalidProfile { field, value });
            }
        }

        if !self.field_of_view.is_finite() || self.field_of_view <= 0.0 || self.field_of_view > 360.0
        {
            return Err(AiError::InvalidProfile {
                field: "field_of_view",
                value: self.field_of_view,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_names_and_levels() {
        assert_eq!("Easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!(" HARD ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!("1".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!(Difficulty::from_level(2).unwrap(), Difficulty::Hard);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(
            "nightmare".parse::<Difficulty>(),
            Err(AiError::UnknownDifficulty(_))
        ));
        assert!(matches!(
            Difficulty::from_level(3),
            Err(AiError::DifficultyLevelOutOfRange(3))
        ));
    }

    #[test]
    fn test_default_is_medium() {
        assert_eq!(Difficulty::default(), Difficulty::Medium);
        assert_eq!(DifficultyProfile::default(), DifficultyProfile::medium());
    }

    #[test]
    fn test_tiers_scale_monotonically() {
        let easy = Difficulty::Easy.profile();
        let medium = Difficulty::Medium.profile();
        let hard = Difficulty::Hard.profile();

        assert!(easy.chase_speed < medium.chase_speed && medium.chase_speed < hard.chase_speed);
        assert!(easy.detection_range < medium.detection_range);
        assert!(medium.detection_range < hard.detection_range);
        assert!(easy.chase_duration < hard.chase_duration);
        assert_relative_eq!(easy.chase_stopping_distance, 1.5);
    }

    #[test]
    fn test_presets_validate() {
        for tier in Difficulty::ALL {
            assert!(tier.profile().validate().is_ok(), "{tier} should validate");
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let profile = DifficultyProfile {
            chase_speed: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            profile.validate(),
            Err(AiError::InvalidProfile {
                field: "chase_speed",
                ..
            })
        ));

        let profile = DifficultyProfile {
            field_of_view: 400.0,
            ..Default::default()
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_half_fov() {
        let profile = DifficultyProfile::medium();
        assert_relative_eq!(profile.half_fov_radians(), 60f32.to_radians(), epsilon = 1e-6);
    }
}
