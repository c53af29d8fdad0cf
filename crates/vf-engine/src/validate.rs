//! Submission validation and prompt sanitization.
//!
//! Pure functions over the submission: no queue, no filesystem. Every
//! violated constraint is reported, not just the first.

use std::ops::RangeInclusive;

use vf_core::error::ValidationError;
use vf_core::params::{Resolution, Submission, ValidatedParams};

/// Bounds enforced at admission time.
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub prompt_max_chars: usize,
    pub duration_secs: RangeInclusive<f32>,
    pub fps: RangeInclusive<u32>,
    pub scene_count_max: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            prompt_max_chars: 1000,
            duration_secs: 1.0..=60.0,
            fps: 12..=30,
            scene_count_max: 10,
        }
    }
}

/// Checks a submission against the limits, returning sanitized
/// parameters or the full list of violations.
pub fn validate(
    submission: &Submission,
    limits: &ValidationLimits,
) -> Result<ValidatedParams, ValidationError> {
    let mut violations = Vec::new();

    let prompt = submission.prompt.trim();
    if prompt.is_empty() {
        violations.push("prompt cannot be empty".to_string());
    } else if prompt.chars().count() > limits.prompt_max_chars {
        violations.push(format!(
            "prompt too long (max {} characters)",
            limits.prompt_max_chars
        ));
    }
    if contains_executable_markup(prompt) {
        violations.push("prompt contains executable markup".to_string());
    }

    if !limits.duration_secs.contains(&submission.duration_secs) {
        violations.push(format!(
            "duration must be between {} and {} seconds",
            limits.duration_secs.start(),
            limits.duration_secs.end()
        ));
    }

    if !limits.fps.contains(&submission.fps) {
        violations.push(format!(
            "fps must be between {} and {}",
            limits.fps.start(),
            limits.fps.end()
        ));
    }

    let resolution = Resolution::parse(&submission.resolution);
    if resolution.is_none() {
        violations.push(format!(
            "unsupported resolution {:?} (expected one of {})",
            submission.resolution,
            Resolution::all()
                .map(|r| r.label().to_string())
                .join(", ")
        ));
    }

    if submission.scene_count < 1 || submission.scene_count > limits.scene_count_max {
        violations.push(format!(
            "scene count must be between 1 and {}",
            limits.scene_count_max
        ));
    }

    match resolution {
        Some(resolution) if violations.is_empty() => Ok(ValidatedParams {
            prompt: escape_markup(prompt),
            duration_secs: submission.duration_secs,
            fps: submission.fps,
            resolution,
            scene_count: submission.scene_count,
            add_music: submission.add_music,
        }),
        _ => Err(ValidationError { violations }),
    }
}

/// Script-bearing sequences are rejected outright rather than escaped.
fn contains_executable_markup(prompt: &str) -> bool {
    let lowered = prompt.to_ascii_lowercase();
    lowered.contains("<script") || lowered.contains("javascript:")
}

/// Escapes the remaining angle brackets so the stored prompt is inert
/// if it is ever replayed into a rendering surface.
fn escape_markup(prompt: &str) -> String {
    prompt
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> Submission {
        Submission {
            prompt: "a sunset over the ocean".into(),
            duration_secs: 5.0,
            fps: 24,
            resolution: "512x512".into(),
            scene_count: 1,
            add_music: false,
        }
    }

    fn limits() -> ValidationLimits {
        ValidationLimits::default()
    }

    #[test]
    fn test_valid_submission_passes() {
        let params = validate(&submission(), &limits()).unwrap();
        assert_eq!(params.prompt, "a sunset over the ocean");
        assert_eq!(params.resolution, Resolution::R512);
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let mut sub = submission();
        sub.prompt = "   ".into();
        let err = validate(&sub, &limits()).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("empty")));
    }

    #[test]
    fn test_overlong_prompt_rejected() {
        let mut sub = submission();
        sub.prompt = "x".repeat(1001);
        let err = validate(&sub, &limits()).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("too long")));
    }

    #[test]
    fn test_script_sequence_rejected() {
        let mut sub = submission();
        sub.prompt = "nice <SCRIPT>alert(1)</script> view".into();
        let err = validate(&sub, &limits()).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("executable markup")));
    }

    #[test]
    fn test_benign_angle_brackets_escaped_not_rejected() {
        let mut sub = submission();
        sub.prompt = "a robot <3 the sea & sky".into();
        let params = validate(&sub, &limits()).unwrap();
        assert_eq!(params.prompt, "a robot &lt;3 the sea &amp; sky");
    }

    #[test]
    fn test_duration_bounds() {
        let mut sub = submission();
        sub.duration_secs = 0.5;
        assert!(validate(&sub, &limits()).is_err());
        sub.duration_secs = 60.0;
        assert!(validate(&sub, &limits()).is_ok());
        sub.duration_secs = 61.0;
        assert!(validate(&sub, &limits()).is_err());
    }

    #[test]
    fn test_fps_bounds() {
        let mut sub = submission();
        sub.fps = 11;
        assert!(validate(&sub, &limits()).is_err());
        sub.fps = 30;
        assert!(validate(&sub, &limits()).is_ok());
    }

    #[test]
    fn test_unlisted_resolution_rejected() {
        let mut sub = submission();
        sub.resolution = "640x480".into();
        let err = validate(&sub, &limits()).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("resolution")));
    }

    #[test]
    fn test_scene_count_bounds() {
        let mut sub = submission();
        sub.scene_count = 0;
        assert!(validate(&sub, &limits()).is_err());
        sub.scene_count = 11;
        assert!(validate(&sub, &limits()).is_err());
        sub.scene_count = 10;
        assert!(validate(&sub, &limits()).is_ok());
    }

    #[test]
    fn test_all_violations_reported_together() {
        let sub = Submission {
            prompt: "".into(),
            duration_secs: 600.0,
            fps: 5,
            resolution: "bogus".into(),
            scene_count: 99,
            add_music: false,
        };
        let err = validate(&sub, &limits()).unwrap_err();
        assert_eq!(err.violations.len(), 5);
    }
}
