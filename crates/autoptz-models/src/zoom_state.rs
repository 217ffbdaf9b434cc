//! States of the PTZ control loop.
//!
//! - `Normal`: full frame, waiting for a target (zooming in once one appears)
//! - `ZoomIn`: fully zoomed on the target, holding still
//! - `PanAndTilt`: gliding the aim point toward a moved target
//! - `ZoomOut`: target lost, easing back to the full frame

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// State of the crop planner's control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZoomState {
    #[default]
    Normal,
    ZoomIn,
    PanAndTilt,
    ZoomOut,
}

impl ZoomState {
    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoomState::Normal => "normal",
            ZoomState::ZoomIn => "zoom_in",
            ZoomState::PanAndTilt => "pan_and_tilt",
            ZoomState::ZoomOut => "zoom_out",
        }
    }

    /// True while the crop is moving frame over frame.
    pub fn is_moving(&self) -> bool {
        matches!(self, ZoomState::PanAndTilt | ZoomState::ZoomOut)
    }
}

impl fmt::Display for ZoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ZoomState {
    type Err = ZoomStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(ZoomState::Normal),
            "zoom_in" => Ok(ZoomState::ZoomIn),
            "pan_and_tilt" | "pan_tilt" => Ok(ZoomState::PanAndTilt),
            "zoom_out" => Ok(ZoomState::ZoomOut),
            _ => Err(ZoomStateParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown zoom state: {0}")]
pub struct ZoomStateParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_state_serialization() {
        let state = ZoomState::PanAndTilt;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"pan_and_tilt\"");

        let parsed: ZoomState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ZoomState::PanAndTilt);
    }

    #[test]
    fn test_zoom_state_from_str() {
        assert_eq!("zoom_in".parse::<ZoomState>().unwrap(), ZoomState::ZoomIn);
        assert_eq!("PAN_TILT".parse::<ZoomState>().unwrap(), ZoomState::PanAndTilt);
        assert!("sideways".parse::<ZoomState>().is_err());
    }

    #[test]
    fn test_default_is_normal() {
        assert_eq!(ZoomState::default(), ZoomState::Normal);
        assert!(!ZoomState::default().is_moving());
    }
}
