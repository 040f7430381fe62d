//! Parsing and formatting of typed flag sets.
//!
//! Flag sets are written as a list of names. A list whose first entry carries
//! a `+` or `-` prefix is applied relative to the current value; otherwise it
//! replaces the value. `None` names the empty set. Names are matched without
//! regard to ASCII case or underscores, so `BreakOnSet` and `BREAK_ON_SET`
//! name the same flag; formatting always uses the `BreakOnSet` spelling.

use bitflags::Flags;
use smol_str::SmolStr;

use crate::error::RuntimeError;

/// Parse `text` against the closed flag set `F`.
pub fn parse_flags<F: Flags + Copy>(
    kind: &'static str,
    current: F,
    text: &str,
) -> Result<F, RuntimeError> {
    let tokens: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == ',' || c == '|')
        .filter(|token| !token.is_empty())
        .collect();
    let relative = tokens
        .first()
        .is_some_and(|token| token.starts_with('+') || token.starts_with('-'));
    let mut value = if relative { current } else { F::empty() };
    for token in tokens {
        let (add, name) = match token.as_bytes()[0] {
            b'+' => (true, &token[1..]),
            b'-' => (false, &token[1..]),
            _ => (true, token),
        };
        let flag = lookup::<F>(kind, name)?;
        if add {
            value.insert(flag);
        } else {
            value.remove(flag);
        }
    }
    Ok(value)
}

fn lookup<F: Flags + Copy>(kind: &'static str, name: &str) -> Result<F, RuntimeError> {
    if name.eq_ignore_ascii_case("none") {
        return Ok(F::empty());
    }
    F::FLAGS
        .iter()
        .find(|flag| same_name(flag.name(), name))
        .map(|flag| *flag.value())
        .ok_or_else(|| RuntimeError::UnknownFlag {
            kind,
            name: SmolStr::new(name),
        })
}

fn same_name(defined: &str, given: &str) -> bool {
    let mut left = defined.chars().filter(|c| *c != '_');
    let mut right = given.chars().filter(|c| *c != '_');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(&b) => {}
            _ => return false,
        }
    }
}

/// Display spelling of a flag constant: `BREAK_ON_SET` becomes `BreakOnSet`.
#[must_use]
pub fn flag_name(defined: &str) -> String {
    defined
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
            })
        })
        .collect()
}

/// Format a flag set as a space separated list of names (`None` when empty).
pub fn format_flags<F: Flags>(value: &F) -> String {
    let names: Vec<String> = value.iter_names().map(|(name, _)| flag_name(name)).collect();
    if names.is_empty() {
        "None".to_string()
    } else {
        names.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    bitflags::bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct Sample: u8 {
            const ALPHA = 1;
            const BETA = 1 << 1;
            const GAMMA_RAY = 1 << 2;
        }
    }

    #[test]
    fn plain_list_replaces_value() {
        let parsed = parse_flags("sample", Sample::GAMMA_RAY, "alpha BETA").unwrap();
        assert_eq!(parsed, Sample::ALPHA | Sample::BETA);
    }

    #[test]
    fn prefixed_list_is_relative() {
        let parsed = parse_flags("sample", Sample::ALPHA | Sample::GAMMA_RAY, "+Beta -alpha").unwrap();
        assert_eq!(parsed, Sample::BETA | Sample::GAMMA_RAY);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = parse_flags("sample", Sample::empty(), "Delta").unwrap_err();
        assert_eq!(err.to_string(), "unknown sample flag \"Delta\"");
    }

    #[test]
    fn none_formats_and_parses() {
        assert_eq!(format_flags(&Sample::empty()), "None");
        assert_eq!(
            parse_flags("sample", Sample::BETA, "None").unwrap(),
            Sample::empty()
        );
        assert_eq!(format_flags(&(Sample::ALPHA | Sample::GAMMA_RAY)), "Alpha GammaRay");
        assert_eq!(
            parse_flags("sample", Sample::empty(), "GammaRay").unwrap(),
            Sample::GAMMA_RAY
        );
    }
}
