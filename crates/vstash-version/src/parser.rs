//! Version specifier parser
//!
//! Grammar: `<name><absolute-marker>?<shift-token>*`
//!
//! The input is scanned left to right for the first index at which a marker
//! or shift token legally begins. Everything before that index is the name;
//! the remainder is tokenized as marker-then-shifts.
//!
//! A `~` directly followed by a letter is rejected instead of being folded
//! into the name, so `/home/user~old/file` never silently parses.

use crate::error::ParseError;
use crate::grammar::{is_value_char, BackendGrammar, IdKind, Marker};
use crate::spec::{AbsoluteIdentifier, VersionSpec};

const SHIFT: char = '~';

/// Parse `text` into a [`VersionSpec`] using `grammar`'s markers
///
/// # Errors
/// - `ParseError::EmptySpec` for blank input
/// - `ParseError::EmptyName` when a marker or shift starts the input
/// - `ParseError::InvalidVersionToken` for a missing/malformed marker value
/// - `ParseError::AmbiguousSpecifier` for `~` followed by a letter
/// - `ParseError::TrailingGarbage` for leftovers after the marker/shift run
pub fn parse(text: &str, grammar: &BackendGrammar) -> Result<VersionSpec, ParseError> {
    let input = text.trim();
    if input.is_empty() {
        return Err(ParseError::EmptySpec);
    }

    let Some(start) = find_suffix_start(input, grammar)? else {
        return Ok(VersionSpec::latest(input));
    };
    if start == 0 {
        return Err(ParseError::EmptyName(input.to_string()));
    }

    let (absolute, shift) = parse_suffix(input, start, grammar)?;
    Ok(VersionSpec {
        name: input[..start].to_string(),
        absolute,
        shift,
    })
}

/// First byte offset where a marker or shift legally begins
fn find_suffix_start(input: &str, grammar: &BackendGrammar) -> Result<Option<usize>, ParseError> {
    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);

        if c == SHIFT {
            match next {
                None | Some(SHIFT) => return Ok(Some(i)),
                Some(n) if n.is_ascii_digit() => return Ok(Some(i)),
                Some(n) if n.is_alphabetic() => {
                    return Err(ParseError::AmbiguousSpecifier {
                        input: input.to_string(),
                        position: i,
                    })
                }
                Some(_) => continue,
            }
        }

        if let Some(marker) = grammar.marker(c) {
            // A bare marker at the end or right before a shift is a marker
            // with a missing value, reported by the suffix parser.
            match next {
                None | Some(SHIFT) => return Ok(Some(i)),
                Some(n) if marker.accepts_start(n) => return Ok(Some(i)),
                Some(_) => {}
            }
        }
    }
    Ok(None)
}

fn parse_suffix(
    input: &str,
    start: usize,
    grammar: &BackendGrammar,
) -> Result<(Option<AbsoluteIdentifier>, u32), ParseError> {
    let mut rest = &input[start..];
    let mut absolute = None;

    if let Some(first) = rest.chars().next() {
        if let Some(marker) = grammar.marker(first) {
            let after = &rest[first.len_utf8()..];
            let (value, tail) = split_run(after, is_value_char);
            absolute = Some(absolute_from(marker, first, value)?);
            rest = tail;
        }
    }

    let mut shift: u32 = 0;
    while let Some(c) = rest.chars().next() {
        if c != SHIFT {
            return Err(ParseError::TrailingGarbage {
                input: input.to_string(),
                rest: rest.to_string(),
            });
        }
        let position = input.len() - rest.len();
        let (digits, tail) = split_run(&rest[1..], |c| c.is_ascii_digit());

        let amount = if digits.is_empty() {
            if tail.chars().next().is_some_and(char::is_alphabetic) {
                return Err(ParseError::AmbiguousSpecifier {
                    input: input.to_string(),
                    position,
                });
            }
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| ParseError::invalid_token(format!("~{digits}"), "shift out of range"))?
        };

        shift = shift
            .checked_add(amount)
            .ok_or_else(|| ParseError::invalid_token(format!("~{digits}"), "cumulative shift overflows"))?;
        rest = tail;
    }

    Ok((absolute, shift))
}

fn absolute_from(marker: Marker, marker_char: char, value: &str) -> Result<AbsoluteIdentifier, ParseError> {
    let token = format!("{marker_char}{value}");
    if value.is_empty() {
        return Err(ParseError::invalid_token(token, "missing value"));
    }
    match marker {
        Marker::Id(IdKind::Numeric) => {
            if !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseError::invalid_token(token, "version must be numeric"));
            }
            value
                .parse::<i64>()
                .map(AbsoluteIdentifier::Numeric)
                .map_err(|_| ParseError::invalid_token(token, "version out of range"))
        }
        Marker::Id(IdKind::Opaque) => Ok(AbsoluteIdentifier::OpaqueId(value.to_string())),
        Marker::Label => Ok(AbsoluteIdentifier::Label(value.to_string())),
    }
}

/// Split `s` after the longest prefix whose chars satisfy `pred`
fn split_run(s: &str, pred: impl Fn(char) -> bool) -> (&str, &str) {
    let end = s.find(|c: char| !pred(c)).unwrap_or(s.len());
    s.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(text: &str) -> Result<VersionSpec, ParseError> {
        parse(text, &BackendGrammar::parameter())
    }

    fn secret(text: &str) -> Result<VersionSpec, ParseError> {
        parse(text, &BackendGrammar::secret())
    }

    #[test]
    fn plain_name() {
        assert_eq!(param("/app/db/url").unwrap(), VersionSpec::latest("/app/db/url"));
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(param("  /p#2  ").unwrap().name, "/p");
    }

    #[test]
    fn numeric_version() {
        let spec = param("/p#12").unwrap();
        assert_eq!(spec.absolute, Some(AbsoluteIdentifier::Numeric(12)));
        assert_eq!(spec.shift, 0);
    }

    #[test]
    fn shift_cumulation() {
        assert_eq!(param("/p~1~2").unwrap().shift, 3);
        assert_eq!(param("/p~~").unwrap().shift, 2);
        assert_eq!(param("/p~").unwrap().shift, 1);
        assert_eq!(param("/p~0").unwrap().shift, 0);
        assert_eq!(param("/p#3~~2").unwrap().shift, 3);
    }

    #[test]
    fn label_and_opaque_id() {
        let spec = secret("creds:previous~1").unwrap();
        assert_eq!(spec.name, "creds");
        assert_eq!(spec.absolute, Some(AbsoluteIdentifier::Label("previous".into())));
        assert_eq!(spec.shift, 1);

        let spec = secret("creds#3f2a-91bc").unwrap();
        assert_eq!(spec.absolute, Some(AbsoluteIdentifier::OpaqueId("3f2a-91bc".into())));
    }

    #[test]
    fn ambiguous_tilde() {
        assert!(matches!(param("/p~backup"), Err(ParseError::AmbiguousSpecifier { .. })));
        assert!(matches!(
            param("/home/user~old/file"),
            Err(ParseError::AmbiguousSpecifier { position: 10, .. })
        ));
        assert!(matches!(param("/p#2~x"), Err(ParseError::AmbiguousSpecifier { .. })));
    }

    #[test]
    fn tilde_before_non_letter_stays_in_name() {
        assert_eq!(param("/a~/b").unwrap().name, "/a~/b");
    }

    #[test]
    fn marker_without_valid_start_stays_in_name() {
        // ':' is not a marker in the parameter grammar
        assert_eq!(param("/a:b").unwrap().name, "/a:b");
        // '#' followed by a letter cannot begin a numeric version
        assert_eq!(param("/a#b").unwrap().name, "/a#b");
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(param("   "), Err(ParseError::EmptySpec));
        assert!(matches!(param("#3"), Err(ParseError::EmptyName(_))));
        assert!(matches!(param("~2"), Err(ParseError::EmptyName(_))));
    }

    #[test]
    fn invalid_tokens() {
        assert!(matches!(param("/p#"), Err(ParseError::InvalidVersionToken { .. })));
        assert!(matches!(param("/p#~1"), Err(ParseError::InvalidVersionToken { .. })));
        assert!(matches!(param("/p#12a"), Err(ParseError::InvalidVersionToken { .. })));
        assert!(matches!(
            param("/p#99999999999999999999"),
            Err(ParseError::InvalidVersionToken { .. })
        ));
        assert!(matches!(param("/p~99999999999"), Err(ParseError::InvalidVersionToken { .. })));
    }

    #[test]
    fn trailing_garbage() {
        assert!(matches!(param("/p#3/x"), Err(ParseError::TrailingGarbage { .. })));
        assert!(matches!(secret("s:current#abc"), Err(ParseError::TrailingGarbage { .. })));
        assert!(matches!(param("/p~1/x"), Err(ParseError::TrailingGarbage { .. })));
    }
}
