//! Property tests for the specifier language.
//!
//! Rendering a spec and parsing it back must be lossless for every grammar
//! variant, and repeated shift tokens always add up.

use proptest::prelude::*;
use vstash_version::{parse, AbsoluteIdentifier, BackendGrammar, ParseError, VersionSpec};

/// Names made of characters that never begin a marker or shift
fn name_strategy() -> impl Strategy<Value = String> {
    "/[a-zA-Z0-9_./-]{0,24}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9_.-]{0,15}"
}

proptest! {
    #[test]
    fn prop_parameter_round_trip(
        name in name_strategy(),
        version in proptest::option::of(0i64..i64::MAX),
        shift in 0u32..1000,
    ) {
        let grammar = BackendGrammar::parameter();
        let mut spec = VersionSpec::latest(name).shifted(shift);
        if let Some(v) = version {
            spec = spec.at(AbsoluteIdentifier::Numeric(v));
        }
        let parsed = parse(&spec.render(&grammar), &grammar).unwrap();
        prop_assert_eq!(parsed, spec);
    }

    #[test]
    fn prop_secret_round_trip(
        name in name_strategy(),
        value in value_strategy(),
        use_label in any::<bool>(),
        shift in 0u32..1000,
    ) {
        let grammar = BackendGrammar::secret();
        let absolute = if use_label {
            AbsoluteIdentifier::Label(value)
        } else {
            AbsoluteIdentifier::OpaqueId(value)
        };
        let spec = VersionSpec::latest(name).at(absolute).shifted(shift);
        let parsed = parse(&spec.render(&grammar), &grammar).unwrap();
        prop_assert_eq!(parsed, spec);
    }

    #[test]
    fn prop_shift_tokens_accumulate(
        name in name_strategy(),
        shifts in proptest::collection::vec(proptest::option::of(0u32..50), 1..8),
    ) {
        let mut text = name.clone();
        let mut expected = 0u32;
        for s in &shifts {
            match s {
                Some(n) => {
                    text.push_str(&format!("~{n}"));
                    expected += n;
                }
                None => {
                    text.push('~');
                    expected += 1;
                }
            }
        }
        let parsed = parse(&text, &BackendGrammar::parameter()).unwrap();
        prop_assert_eq!(parsed.name, name);
        prop_assert_eq!(parsed.shift, expected);
    }

    #[test]
    fn prop_tilde_letter_is_always_ambiguous(
        prefix in name_strategy(),
        word in "[a-zA-Z][a-z]{0,8}",
    ) {
        let text = format!("{prefix}~{word}");
        let result = parse(&text, &BackendGrammar::parameter());
        let is_ambiguous = matches!(result, Err(ParseError::AmbiguousSpecifier { .. }));
        prop_assert!(is_ambiguous);
    }
}
