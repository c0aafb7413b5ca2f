//! Field vetters: one parser per column of a rule line.
use std::time::Duration;

use super::{Age, ModeSpec, Modifiers, RuleKind};
use crate::error::ParseError;

/// Largest value accepted in the mode column.
const MAX_MODE: u32 = 0o7777;

/// Parse the type column into an action kind and its modifiers.
///
/// # Errors
///
/// Returns [`ParseError::UnknownType`] for an unknown action letter and
/// [`ParseError::UnsupportedModifier`] for an unknown modifier character.
pub fn parse_type(field: &str) -> Result<(RuleKind, Modifiers), ParseError> {
    let mut chars = field.chars();
    let letter = chars
        .next()
        .ok_or_else(|| ParseError::TooFewFields(field.to_string()))?;
    let kind = RuleKind::from_char(letter).ok_or(ParseError::UnknownType(letter))?;

    let mut modifiers = Modifiers::default();
    for c in chars {
        match c {
            '!' => modifiers.boot_only = true,
            '-' => modifiers.no_error = true,
            '=' => modifiers.no_match_remove = true,
            '~' => modifiers.base64 = true,
            '^' => modifiers.credential = true,
            '+' => modifiers.plus = true,
            other => return Err(ParseError::UnsupportedModifier(other)),
        }
    }
    Ok((kind, modifiers))
}

/// Parse the mode column.
///
/// Absent or `-` selects the type default; a leading `~` marks a mask.
///
/// # Errors
///
/// Returns [`ParseError::InvalidMode`] if the value is not octal or is out
/// of range.
pub fn parse_mode(field: Option<&str>) -> Result<ModeSpec, ParseError> {
    let raw = match field {
        None | Some("-") => return Ok(ModeSpec::Default),
        Some(raw) => raw,
    };
    let (masked, digits) = raw
        .strip_prefix('~')
        .map_or((false, raw), |rest| (true, rest));

    let invalid = || ParseError::InvalidMode(raw.to_string());
    if digits.is_empty() || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return Err(invalid());
    }
    let value = u32::from_str_radix(digits, 8).map_err(|_| invalid())?;
    if value > MAX_MODE {
        return Err(invalid());
    }
    Ok(if masked {
        ModeSpec::Masked(value)
    } else {
        ModeSpec::Explicit(value)
    })
}

/// Microseconds per unit suffix accepted in the age column.
fn unit_micros(suffix: &str) -> Option<u64> {
    const SECOND: u64 = 1_000_000;
    match suffix {
        "" | "s" => Some(SECOND),
        "ms" => Some(1_000),
        "m" | "min" => Some(60 * SECOND),
        "h" => Some(60 * 60 * SECOND),
        "d" => Some(24 * 60 * 60 * SECOND),
        "w" => Some(7 * 24 * 60 * 60 * SECOND),
        _ => None,
    }
}

/// Parse the age column.
///
/// Absent or `-` means no age constraint. A leading `~` restricts cleaning
/// to the entries directly inside the directory.
///
/// # Errors
///
/// Returns [`ParseError::InvalidAge`] if the value is not an integer with a
/// known unit suffix, or overflows.
pub fn parse_age(field: Option<&str>) -> Result<Option<Age>, ParseError> {
    let raw = match field {
        None | Some("-") => return Ok(None),
        Some(raw) => raw,
    };
    let (subdirectories_only, body) = raw
        .strip_prefix('~')
        .map_or((false, raw), |rest| (true, rest));

    let invalid = || ParseError::InvalidAge(raw.to_string());
    let split = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (number, suffix) = body.split_at(split);
    if number.is_empty() {
        return Err(invalid());
    }
    let count: u64 = number.parse().map_err(|_| invalid())?;
    let micros = unit_micros(suffix)
        .and_then(|unit| count.checked_mul(unit))
        .ok_or_else(invalid)?;

    Ok(Some(Age {
        duration: Duration::from_micros(micros),
        subdirectories_only,
    }))
}

/// Parse a `MAJOR:MINOR` device argument.
///
/// # Errors
///
/// Returns [`ParseError::InvalidDevice`] if the argument is absent or
/// malformed.
pub fn parse_device(argument: Option<&str>) -> Result<(u64, u64), ParseError> {
    let raw = argument.unwrap_or_default().trim();
    let invalid = || ParseError::InvalidDevice(raw.to_string());
    let (major, minor) = raw.split_once(':').ok_or_else(invalid)?;
    let major = major.trim().parse().map_err(|_| invalid())?;
    let minor = minor.trim().parse().map_err(|_| invalid())?;
    Ok((major, minor))
}
