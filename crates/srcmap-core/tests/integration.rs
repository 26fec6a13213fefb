//! End-to-end scenarios exercising the full vlq -> segment -> store ->
//! facade stack together, rather than one layer in isolation.

use pretty_assertions::assert_eq;

use srcmap_core::bias::Bias;
use srcmap_core::facade::{CodeContextOptions, SourceMap};
use srcmap_core::segment::Segment;
use srcmap_core::store::{Line, MappingStore, RebaseOffsets};
use srcmap_core::vlq;

#[test]
fn vlq_singletons_round_trip() {
    let cases = [(0, "A"), (1, "C"), (-1, "D"), (1000, "w+B"), (-1000, "x+B")];
    for (value, wire) in cases {
        assert_eq!(vlq::encode(value), wire);
        assert_eq!(vlq::decode_many(wire).unwrap(), vec![value]);
    }
}

#[test]
fn single_segment_decodes_into_one_present_line() {
    let mut store = MappingStore::new();
    store.decode_string("AAAA", RebaseOffsets::default()).unwrap();

    assert_eq!(store.line_count(), 1);
    assert_eq!(
        store.lines()[0],
        Line::Present(vec![Segment {
            generated_line: 1,
            generated_column: 1,
            source_line: 1,
            source_column: 1,
            source_index: 0,
            name_index: None,
        }])
    );
}

#[test]
fn nontrivial_string_round_trips_byte_for_byte() {
    let mut store = MappingStore::new();
    let wire = "AAAA;AACA,AADA;AAGA;";
    store.decode_string(wire, RebaseOffsets::default()).unwrap();
    assert_eq!(store.encode(), wire);
}

#[test]
fn absent_frames_land_on_the_right_lines() {
    let mut store = MappingStore::new();
    store
        .decode_string("AAAA;;;AADA;", RebaseOffsets::default())
        .unwrap();

    assert_eq!(store.line_count(), 5);
    assert_eq!(store.lines()[1], Line::Absent);
    assert_eq!(store.lines()[2], Line::Absent);
    assert_eq!(store.lines()[4], Line::Absent);
}

#[test]
fn name_offset_shifts_the_decoded_index() {
    let mut store = MappingStore::new();
    let offsets = RebaseOffsets {
        name: 3,
        ..Default::default()
    };
    store.decode_string("AAAAE", offsets).unwrap();

    let Line::Present(segments) = &store.lines()[0] else {
        panic!("expected a present line");
    };
    assert_eq!(segments[0].name_index, Some(5));
}

#[test]
fn reverse_lookup_respects_bias() {
    let mut store = MappingStore::new();
    // three segments at source column 1, 5, 10, same source/line.
    store
        .decode_string("AAAA,AAAI,AAAK", RebaseOffsets::default())
        .unwrap();

    assert_eq!(
        store.get_by_original(1, 6, 0, Bias::Floor).unwrap().source_column,
        5
    );
    assert_eq!(
        store.get_by_original(1, 6, 0, Bias::Ceil).unwrap().source_column,
        10
    );
    assert_eq!(store.get_by_original(1, 6, 0, Bias::Exact), None);
}

#[test]
fn invalid_character_names_the_offending_byte() {
    let mut store = MappingStore::new();
    let err = store
        .decode_string("AAAA;A#A", RebaseOffsets::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "frame 2: invalid character '#' at offset 1 in mappings string");
}

#[test]
fn incomplete_vlq_sequence_is_reported() {
    let err = vlq::decode_many("g").unwrap_err();
    assert_eq!(err.to_string(), "incomplete VLQ sequence at end of input");
}

#[test]
fn composition_shifts_indices_and_round_trips() {
    let mut a = SourceMap::from_json(
        r#"{"version":3,"sources":["a.js"],"mappings":"AAAA;AAAA;AAAA;AAAA"}"#,
    )
    .unwrap();
    let b = SourceMap::from_json(
        r#"{"version":3,"sources":["b.js","c.js"],"names":["helper"],"mappings":"AAAAA;AACAA;AAEAA"}"#,
    )
    .unwrap();

    a.concat(&[&b]).unwrap();

    assert_eq!(a.generated_line_count(), 7);
    assert_eq!(
        a.sources(),
        &["a.js".to_string(), "b.js".to_string(), "c.js".to_string()]
    );
    assert_eq!(a.names(), &["helper".to_string()]);

    for (generated_line, expected_name) in [(5, Some(0)), (6, Some(0)), (7, Some(0))] {
        let position = a.get_by_generated(generated_line, 1, Bias::Exact).unwrap();
        assert_eq!(position.source_index, 1);
        assert_eq!(position.name_index, expected_name);
    }

    // Round trip: re-encode and re-decode the composed map, expect the
    // same generated line/source/name shape back out.
    let re_decoded = SourceMap::from_json(&a.to_json().unwrap()).unwrap();
    assert_eq!(re_decoded.generated_line_count(), a.generated_line_count());
    assert_eq!(re_decoded.sources(), a.sources());
    assert_eq!(re_decoded.names(), a.names());
}

#[test]
fn facade_round_trips_a_full_envelope_with_code_context() {
    let content = "function add(a, b) {\n  return a + b;\n}\n";
    let json = format!(
        r#"{{
            "version": 3,
            "file": "bundle.min.js",
            "sources": ["src/math.js"],
            "sourcesContent": [{:?}],
            "names": ["add"],
            "mappings": "AAAAA"
        }}"#,
        content
    );

    let map = SourceMap::from_json(&json).unwrap();
    let with_code = map
        .get_by_generated_with_code(1, 1, Bias::Exact, CodeContextOptions::default())
        .unwrap();

    assert_eq!(with_code.position.source_path, "src/math.js");
    assert_eq!(with_code.position.name.as_deref(), Some("add"));
    assert!(with_code
        .code_context
        .iter()
        .any(|line| line.content.contains("function add")));
}
