//! Route name validation.
//!
//! # Responsibilities
//! - Check route names against the route grammar
//! - Report a distinct, actionable message for each violated rule
//! - Support the system-route variant (leading underscore)
//!
//! # Design Decisions
//! - No regex: a few linear scans over ASCII bytes
//! - Rules are checked in a fixed order so the same name always yields the same message
//! - Unknown but well-formed routes are valid here; lookup is a dispatch concern

use thiserror::Error;

/// A violated route-name rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouteNameError {
    #[error("Route is required")]
    Required,

    #[error("Route should be at least two characters long")]
    TooShort,

    #[error("Route should start with a letter")]
    LeadingCharacter,

    #[error("Route should end with a letter or a number")]
    TrailingCharacter,

    #[error("Route should contain only letters, numbers, dashes, underscores, and forward slashes")]
    DisallowedCharacter,

    #[error("System route should be at least three characters long")]
    SystemTooShort,

    #[error("System route should start with an underscore followed by a letter")]
    SystemLeadingCharacter,

    #[error("System route should end with a letter or a number")]
    SystemTrailingCharacter,

    #[error("System route should contain only letters, numbers, dashes, underscores, and forward slashes")]
    SystemDisallowedCharacter,

    #[error("Sub-routes should start with a letter")]
    SubRouteLeadingCharacter,

    #[error("Sub-routes should end with a letter or a number")]
    SubRouteTrailingCharacter,

    #[error("Sub-routes should be at least two characters long")]
    SubRouteTooShort,
}

fn is_allowed(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'/')
}

/// Validate a route name.
///
/// `system` selects the system-route grammar, where the first segment starts
/// with `_` followed by a letter instead of a letter.
pub fn validate_route_name(name: &str, system: bool) -> Result<(), RouteNameError> {
    let bytes = name.as_bytes();
    let (Some(&first), Some(&last)) = (bytes.first(), bytes.last()) else {
        return Err(RouteNameError::Required);
    };

    if system {
        if bytes.len() < 3 {
            return Err(RouteNameError::SystemTooShort);
        }
        if first != b'_' || !bytes[1].is_ascii_alphabetic() {
            return Err(RouteNameError::SystemLeadingCharacter);
        }
        if !last.is_ascii_alphanumeric() {
            return Err(RouteNameError::SystemTrailingCharacter);
        }
        if !bytes.iter().copied().all(is_allowed) {
            return Err(RouteNameError::SystemDisallowedCharacter);
        }
    } else {
        if bytes.len() < 2 {
            return Err(RouteNameError::TooShort);
        }
        if !first.is_ascii_alphabetic() {
            return Err(RouteNameError::LeadingCharacter);
        }
        if !last.is_ascii_alphanumeric() {
            return Err(RouteNameError::TrailingCharacter);
        }
        if !bytes.iter().copied().all(is_allowed) {
            return Err(RouteNameError::DisallowedCharacter);
        }
    }

    // The whole-name checks above already cover the first segment's leading
    // character and the last segment's trailing character.
    let segments: Vec<&[u8]> = bytes.split(|&b| b == b'/').collect();

    let bad_start = segments
        .iter()
        .skip(1)
        .any(|segment| !segment.first().is_some_and(u8::is_ascii_alphabetic));
    if bad_start {
        return Err(RouteNameError::SubRouteLeadingCharacter);
    }

    let bad_end = segments[..segments.len() - 1]
        .iter()
        .any(|segment| !segment.last().is_some_and(u8::is_ascii_alphanumeric));
    if bad_end {
        return Err(RouteNameError::SubRouteTrailingCharacter);
    }

    if segments.len() > 1 && segments.iter().any(|segment| segment.len() < 2) {
        return Err(RouteNameError::SubRouteTooShort);
    }

    Ok(())
}
