use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Wind given as direction (degrees) and speed (knots), written `DDD/SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindVector {
    pub direction: u16,
    pub speed: u16,
}

impl WindVector {
    pub fn new(direction: u16, speed: u16) -> Result<Self> {
        if direction > 360 {
            return Err(PipelineError::InvalidWind(format!(
                "direction {} is outside 0-360 degrees",
                direction
            )));
        }
        Ok(Self { direction, speed })
    }
}

impl FromStr for WindVector {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || PipelineError::InvalidWind(format!("'{}' is not DDD/SS", trimmed));

        let (dir, spd) = trimmed.split_once('/').ok_or_else(invalid)?;
        let digits = |v: &str| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit());
        if dir.len() != 3 || !digits(dir) || !(2..=3).contains(&spd.len()) || !digits(spd) {
            return Err(invalid());
        }

        let direction = dir.parse::<u16>().map_err(|_| invalid())?;
        let speed = spd.parse::<u16>().map_err(|_| invalid())?;
        Self::new(direction, speed)
    }
}

impl std::fmt::Display for WindVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}/{:02}", self.direction, self.speed)
    }
}

/// Storm motion used for storm-relative parameters on the hodograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StormMotion {
    /// Bunkers right mover (`BRM`)
    #[default]
    RightMover,
    /// Bunkers left mover (`BLM`)
    LeftMover,
    Vector(WindVector),
}

impl FromStr for StormMotion {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "BRM" | "RIGHT-MOVER" => Ok(StormMotion::RightMover),
            "BLM" | "LEFT-MOVER" => Ok(StormMotion::LeftMover),
            other => other.parse().map(StormMotion::Vector),
        }
    }
}

impl std::fmt::Display for StormMotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StormMotion::RightMover => write!(f, "right-mover"),
            StormMotion::LeftMover => write!(f, "left-mover"),
            StormMotion::Vector(v) => write!(f, "{}", v),
        }
    }
}
