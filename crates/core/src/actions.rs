//! Action kinds, control identifier encoding, and the rating vocabulary.
//!
//! Control identifiers are colon-delimited token strings baked into the
//! interactive controls attached to a result message. They are the only
//! state a follow-up press carries, so encoding and parsing must agree
//! exactly.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, UserId};

/// Kind of work a generation job performs.
///
/// Serialized lowercase on the wire (`action` field of requests and
/// streamed updates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobAction {
    /// Fresh generation from a text prompt.
    Generate,
    /// Enlarge one image of a previous result.
    Upscale,
    /// Re-roll one image of a previous result.
    Variation,
}

impl JobAction {
    /// Lowercase token used in control identifiers and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::Generate => "generate",
            JobAction::Upscale => "upscale",
            JobAction::Variation => "variation",
        }
    }
}

/// Kind of a user-triggered follow-up press.
///
/// One dispatcher handler exists per variant; adding a kind is a
/// compile-time exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpKind {
    Upscale,
    Variation,
    Rate,
}

impl FollowUpKind {
    /// Lowercase token used as the first control identifier segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUpKind::Upscale => "upscale",
            FollowUpKind::Variation => "variation",
            FollowUpKind::Rate => "rate",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "upscale" => Some(FollowUpKind::Upscale),
            "variation" => Some(FollowUpKind::Variation),
            "rate" => Some(FollowUpKind::Rate),
            _ => None,
        }
    }

    /// The job action a follow-up submits, if it submits one at all.
    /// Rating has no external job.
    pub fn job_action(&self) -> Option<JobAction> {
        match self {
            FollowUpKind::Upscale => Some(JobAction::Upscale),
            FollowUpKind::Variation => Some(JobAction::Variation),
            FollowUpKind::Rate => None,
        }
    }
}

/// A parsed follow-up press, decoded from a control identifier.
///
/// `user_id` is the user recorded at encoding time (the one who ran the
/// original command), not necessarily the user pressing the control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpRequest {
    pub kind: FollowUpKind,
    pub user_id: UserId,
    pub job_id: JobId,
    pub image_index: u32,
}

/// Encode a follow-up control identifier: `kind:user:job:index`.
pub fn encode_control_id(kind: FollowUpKind, user_id: &str, job_id: &str, index: u32) -> String {
    format!("{}:{user_id}:{job_id}:{index}", kind.as_str())
}

/// Encode a rating control identifier: `rate:user:job:index:value`.
///
/// The trailing value token only keeps sibling rating controls distinct;
/// the semantic rating is resolved from the pressed control's glyph.
pub fn encode_rating_control_id(user_id: &str, job_id: &str, index: u32, value: &str) -> String {
    format!("rate:{user_id}:{job_id}:{index}:{value}")
}

/// Parse a pressed control's identifier into a [`FollowUpRequest`].
///
/// Exactly four tokens are consumed; rating identifiers may carry a
/// fifth disambiguating token which is ignored here.
pub fn parse_control_id(control_id: &str) -> Result<FollowUpRequest, CoreError> {
    let malformed = || CoreError::MalformedControlId(control_id.to_string());

    let tokens: Vec<&str> = control_id.split(':').collect();
    let kind = tokens
        .first()
        .and_then(|t| FollowUpKind::parse(t))
        .ok_or_else(malformed)?;

    let expected = match kind {
        FollowUpKind::Rate => 5,
        _ => 4,
    };
    if tokens.len() != expected {
        return Err(malformed());
    }
    if tokens[1].is_empty() || tokens[2].is_empty() {
        return Err(malformed());
    }

    let image_index: u32 = tokens[3].parse().map_err(|_| malformed())?;

    Ok(FollowUpRequest {
        kind,
        user_id: tokens[1].to_string(),
        job_id: tokens[2].to_string(),
        image_index,
    })
}

/// One entry of the fixed rating vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingOption {
    /// Symbolic value persisted with the rated record.
    pub value: &'static str,
    /// Glyph shown on the control, also used to resolve the value back.
    pub glyph: &'static str,
}

/// The fixed rating vocabulary, worst to best.
pub const RATING_OPTIONS: &[RatingOption] = &[
    RatingOption {
        value: "awful",
        glyph: "\u{1F616}",
    },
    RatingOption {
        value: "bad",
        glyph: "\u{2639}\u{FE0F}",
    },
    RatingOption {
        value: "neutral",
        glyph: "\u{1F610}",
    },
    RatingOption {
        value: "good",
        glyph: "\u{1F642}",
    },
    RatingOption {
        value: "amazing",
        glyph: "\u{1F60D}",
    },
];

/// Resolve a rating option from a pressed control's glyph.
pub fn rating_for_glyph(glyph: &str) -> Result<&'static RatingOption, CoreError> {
    RATING_OPTIONS
        .iter()
        .find(|option| option.glyph == glyph)
        .ok_or_else(|| CoreError::UnknownRatingGlyph(glyph.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_id_round_trip() {
        let id = encode_control_id(FollowUpKind::Upscale, "1001", "job-9", 2);
        assert_eq!(id, "upscale:1001:job-9:2");

        let parsed = parse_control_id(&id).unwrap();
        assert_eq!(parsed.kind, FollowUpKind::Upscale);
        assert_eq!(parsed.user_id, "1001");
        assert_eq!(parsed.job_id, "job-9");
        assert_eq!(parsed.image_index, 2);
    }

    #[test]
    fn rating_id_ignores_trailing_value_token() {
        let id = encode_rating_control_id("42", "job-1", 0, "good");
        let parsed = parse_control_id(&id).unwrap();
        assert_eq!(parsed.kind, FollowUpKind::Rate);
        assert_eq!(parsed.job_id, "job-1");
        assert_eq!(parsed.image_index, 0);
    }

    #[test]
    fn unknown_kind_is_malformed() {
        assert!(parse_control_id("delete:1:2:3").is_err());
    }

    #[test]
    fn wrong_token_count_is_malformed() {
        assert!(parse_control_id("upscale:1:2").is_err());
        assert!(parse_control_id("upscale:1:2:3:4").is_err());
        assert!(parse_control_id("rate:1:2:3").is_err());
    }

    #[test]
    fn non_numeric_index_is_malformed() {
        assert!(parse_control_id("variation:1:job:first").is_err());
    }

    #[test]
    fn empty_tokens_are_malformed() {
        assert!(parse_control_id("upscale::job:0").is_err());
        assert!(parse_control_id("upscale:1::0").is_err());
    }

    #[test]
    fn glyph_resolves_to_rating_value() {
        let option = rating_for_glyph("\u{1F60D}").unwrap();
        assert_eq!(option.value, "amazing");
    }

    #[test]
    fn unknown_glyph_is_rejected() {
        assert!(rating_for_glyph("??").is_err());
    }

    #[test]
    fn job_action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobAction::Upscale).unwrap(),
            "\"upscale\""
        );
        let parsed: JobAction = serde_json::from_str("\"variation\"").unwrap();
        assert_eq!(parsed, JobAction::Variation);
    }
}
