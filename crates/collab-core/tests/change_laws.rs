//! Property tests for the change algebra laws.
//!
//! These check the contracts everything else in the crate leans on:
//! invertibility, composition, transform convergence and batch-mapping
//! equivalence, over generated documents and generated changes.

use collab_core::{Assoc, ChangeSet, PositionMapper, Rope};
use proptest::prelude::*;

/// One step of a generated edit script: `(kind, span, text)`.
type ScriptStep = (u8, usize, String);

fn arb_text() -> impl Strategy<Value = String> {
    // Mixed ASCII, multi-byte and astral scalars, newlines included.
    proptest::collection::vec(
        prop_oneof![
            5 => proptest::char::range('a', 'z'),
            1 => Just('\n'),
            1 => proptest::char::range('À', 'ÿ'),
            1 => proptest::char::range('一', '鿿'),
            1 => proptest::char::range('𝄀', '𝄪'),
        ],
        0..120,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn arb_script() -> impl Strategy<Value = Vec<ScriptStep>> {
    proptest::collection::vec(
        (
            0u8..3,
            1usize..12,
            proptest::collection::vec(
                prop_oneof![
                    4 => proptest::char::range('a', 'z'),
                    1 => proptest::char::range('𝄀', '𝄪'),
                ],
                0..8,
            )
            .prop_map(|chars| chars.into_iter().collect::<String>()),
        ),
        0..10,
    )
}

/// Materializes a random edit script into a changeset that is valid for
/// `doc`: retain/delete spans are aligned to scalar boundaries, so every
/// generated change applies cleanly.
fn build_change(doc: &Rope, script: &[ScriptStep]) -> ChangeSet {
    let chars: Vec<char> = doc.text().chars().collect();
    let mut builder = ChangeSet::builder(doc.len_utf16());
    let mut idx = 0usize;
    for (kind, span, text) in script {
        match kind % 3 {
            0 | 1 => {
                let take = (*span).min(chars.len() - idx);
                if take == 0 {
                    continue;
                }
                let units: usize = chars[idx..idx + take].iter().map(|c| c.len_utf16()).sum();
                builder = if kind % 3 == 0 {
                    builder.retain(units)
                } else {
                    builder.delete(units)
                };
                idx += take;
            }
            _ => {
                builder = builder.insert(text);
            }
        }
    }
    let rest: usize = chars[idx..].iter().map(|c| c.len_utf16()).sum();
    builder.retain(rest).build().expect("script covers the document")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// apply(invert(c, r), apply(c, r)) == r
    #[test]
    fn invertibility(text in arb_text(), script in arb_script()) {
        let doc = Rope::from_text(&text);
        let change = build_change(&doc, &script);
        let after = change.apply(&doc).unwrap();
        prop_assert_eq!(after.len_utf16(), change.len_after());

        let inverse = change.invert(&doc).unwrap();
        let restored = inverse.apply(&after).unwrap();
        prop_assert_eq!(restored.text(), doc.text());
        prop_assert_eq!(restored.hash64(), doc.hash64());
    }

    /// apply(compose(a, b), r) == apply(b, apply(a, r))
    #[test]
    fn composition(text in arb_text(), s1 in arb_script(), s2 in arb_script()) {
        let doc = Rope::from_text(&text);
        let first = build_change(&doc, &s1);
        let mid = first.apply(&doc).unwrap();
        let second = build_change(&mid, &s2);

        let sequential = second.apply(&mid).unwrap();
        match first.compose(&second) {
            Ok(composed) => {
                prop_assert_eq!(composed.len_before(), first.len_before());
                prop_assert_eq!(composed.len_after(), second.len_after());
                let direct = composed.apply(&doc).unwrap();
                prop_assert_eq!(direct.text(), sequential.text());
            }
            // Composition may legitimately refuse when an op boundary in
            // `second` would split a surrogate pair inserted by `first`.
            Err(collab_core::Error::InvalidInput { .. }) => {}
            Err(err) => return Err(TestCaseError::fail(format!("compose failed: {}", err))),
        }
    }

    /// apply(b', apply(a, r)) == apply(a', apply(b, r))
    #[test]
    fn transform_convergence(text in arb_text(), s1 in arb_script(), s2 in arb_script()) {
        let doc = Rope::from_text(&text);
        let a = build_change(&doc, &s1);
        let b = build_change(&doc, &s2);

        let (a_prime, b_prime) = a.transform(&b).unwrap();
        prop_assert_eq!(a_prime.len_before(), b.len_after());
        prop_assert_eq!(b_prime.len_before(), a.len_after());

        let via_a = b_prime.apply(&a.apply(&doc).unwrap()).unwrap();
        let via_b = a_prime.apply(&b.apply(&doc).unwrap()).unwrap();
        prop_assert_eq!(via_a.text(), via_b.text());
        prop_assert_eq!(via_a.hash64(), via_b.hash64());
    }

    /// Streamed batch mapping equals per-position mapping for sorted input.
    #[test]
    fn batch_mapping_equivalence(text in arb_text(), script in arb_script()) {
        let doc = Rope::from_text(&text);
        let change = build_change(&doc, &script);
        let len = change.len_before();

        let assocs = [
            Assoc::Before,
            Assoc::After,
            Assoc::BeforeSticky,
            Assoc::AfterSticky,
        ];
        let positions: Vec<(usize, Assoc)> = (0..=len)
            .map(|pos| (pos, assocs[pos % assocs.len()]))
            .collect();

        let mapper = PositionMapper::new(&change);
        let batch = mapper.map(&positions);
        let individual: Vec<usize> = positions
            .iter()
            .map(|&(pos, assoc)| change.map_pos(pos, assoc))
            .collect();
        prop_assert_eq!(batch, individual);
    }

    /// Mapped positions always stay within the post-change document.
    #[test]
    fn mapping_stays_in_bounds(text in arb_text(), script in arb_script()) {
        let doc = Rope::from_text(&text);
        let change = build_change(&doc, &script);
        for pos in 0..=change.len_before() {
            for assoc in [Assoc::Before, Assoc::After, Assoc::BeforeSticky, Assoc::AfterSticky] {
                prop_assert!(change.map_pos(pos, assoc) <= change.len_after());
            }
        }
    }

    /// Composing a change with its inverse yields the identity behavior.
    #[test]
    fn invert_composes_to_identity(text in arb_text(), script in arb_script()) {
        let doc = Rope::from_text(&text);
        let change = build_change(&doc, &script);
        let inverse = change.invert(&doc).unwrap();
        match change.compose(&inverse) {
            Ok(round_trip) => {
                prop_assert_eq!(round_trip.len_before(), doc.len_utf16());
                prop_assert_eq!(round_trip.len_after(), doc.len_utf16());
                let back = round_trip.apply(&doc).unwrap();
                prop_assert_eq!(back.text(), doc.text());
            }
            Err(collab_core::Error::InvalidInput { .. }) => {}
            Err(err) => return Err(TestCaseError::fail(format!("compose failed: {}", err))),
        }
    }
}
