//! Consent values and consent-cookie parsing.

use serde::{Deserialize, Serialize};

/// A consent decision for the general purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    /// Data collection may proceed.
    In,
    /// Data collection was declined.
    Out,
    /// No decision yet; submission is suspended until one arrives.
    Pending,
}

impl ConsentStatus {
    /// Parses the wire/cookie token (`in` / `out` / `pending`).
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "in" => Some(ConsentStatus::In),
            "out" => Some(ConsentStatus::Out),
            "pending" => Some(ConsentStatus::Pending),
            _ => None,
        }
    }

    /// The cookie/wire token for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::In => "in",
            ConsentStatus::Out => "out",
            ConsentStatus::Pending => "pending",
        }
    }
}

/// Parses a stored consent cookie value of the form `general=in;other=out`.
///
/// Only the `general` purpose participates in gating. Returns `None` when
/// the value carries no parsable general decision.
pub fn parse_consent_cookie(value: &str) -> Option<ConsentStatus> {
    value.split(';').find_map(|pair| {
        let mut parts = pair.trim().splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some("general"), Some(token)) => ConsentStatus::parse(token.trim()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_general_purpose() {
        assert_eq!(parse_consent_cookie("general=in"), Some(ConsentStatus::In));
        assert_eq!(
            parse_consent_cookie("other=in;general=out"),
            Some(ConsentStatus::Out)
        );
    }

    #[test]
    fn ignores_unknown_tokens() {
        assert_eq!(parse_consent_cookie("general=maybe"), None);
        assert_eq!(parse_consent_cookie(""), None);
        assert_eq!(parse_consent_cookie("other=in"), None);
    }
}
