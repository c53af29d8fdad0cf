//! Submission and generation parameter types.

use serde::{Deserialize, Serialize};

/// Raw submission as received from the presentation layer.
///
/// Nothing here is trusted; the validator turns a `Submission` into
/// [`ValidatedParams`] or rejects it with the complete list of
/// violations.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub prompt: String,
    pub duration_secs: f32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    pub resolution: String,
    #[serde(default = "default_scene_count")]
    pub scene_count: u32,
    #[serde(default)]
    pub add_music: bool,
}

fn default_fps() -> u32 {
    24
}

fn default_scene_count() -> u32 {
    1
}

/// Output resolutions the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "256x256")]
    R256,
    #[serde(rename = "512x512")]
    R512,
    #[serde(rename = "768x768")]
    R768,
    #[serde(rename = "1024x1024")]
    R1024,
}

impl Resolution {
    pub fn width(&self) -> u32 {
        match self {
            Self::R256 => 256,
            Self::R512 => 512,
            Self::R768 => 768,
            Self::R1024 => 1024,
        }
    }

    pub fn height(&self) -> u32 {
        self.width()
    }

    pub fn label(&self) -> &str {
        match self {
            Self::R256 => "256x256",
            Self::R512 => "512x512",
            Self::R768 => "768x768",
            Self::R1024 => "1024x1024",
        }
    }

    /// Parses a `WxH` string against the allow-list.
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|r| r.label() == s.trim())
    }

    pub fn all() -> [Resolution; 4] {
        [Self::R256, Self::R512, Self::R768, Self::R1024]
    }
}

/// Generation parameters after validation. The executor trusts these.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedParams {
    pub prompt: String,
    pub duration_secs: f32,
    pub fps: u32,
    pub resolution: Resolution,
    pub scene_count: u32,
    pub add_music: bool,
}

impl ValidatedParams {
    /// Wall-clock length of one scene segment.
    pub fn segment_secs(&self) -> f32 {
        self.duration_secs / self.scene_count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parse() {
        assert_eq!(Resolution::parse("512x512"), Some(Resolution::R512));
        assert_eq!(Resolution::parse(" 1024x1024 "), Some(Resolution::R1024));
        assert_eq!(Resolution::parse("640x480"), None);
    }

    #[test]
    fn test_segment_secs_splits_duration() {
        let params = ValidatedParams {
            prompt: "a sunset".into(),
            duration_secs: 12.0,
            fps: 24,
            resolution: Resolution::R512,
            scene_count: 4,
            add_music: false,
        };
        assert_eq!(params.segment_secs(), 3.0);
    }
}
