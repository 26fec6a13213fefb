//! The Mapping Store: an ordered, line-indexed collection of segments.
//!
//! Owns decode/encode of whole mapping strings plus the two position
//! lookups and the reverse-index builder. This is where most of the
//! crate's logic lives — the VLQ and Segment codecs are small, tight
//! leaves; this module is the part that actually behaves like a database.

use std::collections::BTreeMap;

use crate::bias::Bias;
use crate::error::SourceMapError;
use crate::segment::{self, DeltaOffset, Segment};
use crate::vlq;

/// Rebase amounts applied while decoding, used both for plain re-parsing
/// (all zero) and for composition (`concat`), where a later map's `names`/
/// `sources` indices need to be shifted past the receiving map's existing
/// tables. Generated line numbers need no such offset: appending always
/// continues from the receiving store's current line count, so the shift
/// falls out of direct indexing rather than a separate parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RebaseOffsets {
    pub name: i64,
    pub sources: i64,
}

/// One generated line's worth of segments, or nothing at all.
///
/// An `Absent` line corresponds to an empty frame between two `;`
/// delimiters in the wire format — the generated line exists but
/// contributes no mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Absent,
    Present(Vec<Segment>),
}

/// A reverse index from `(source_index, source_line)` to the segments
/// that map to it, sorted ascending by `source_column`.
///
/// Built on demand by [`MappingStore::build_original_index`]; never
/// maintained incrementally, so it goes stale the instant the store that
/// produced it is mutated further.
#[derive(Debug, Clone, Default)]
pub struct OriginalIndex {
    buckets: BTreeMap<(u32, u32), Vec<Segment>>,
}

impl OriginalIndex {
    /// Segments at this `(source_index, source_line)`, sorted ascending
    /// by `source_column`. Empty slice if the key has no segments.
    pub fn lookup(&self, source_index: u32, source_line: u32) -> &[Segment] {
        self.buckets
            .get(&(source_index, source_line))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// An ordered, line-indexed collection of segments decoded from one or
/// more mapping strings.
///
/// Line index `i` always corresponds to 1-based generated line `i + 1`.
/// New lines are only ever appended — `decode_string`/`decode_array`/
/// `decode_from` never modify existing lines, which is what lets
/// composition (`concat`) simply keep appending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingStore {
    lines: Vec<Line>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of generated lines currently held (present and absent).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Decode a Base64-VLQ mappings string and append its lines.
    ///
    /// The entire string must match `[A-Za-z0-9+/,;]+`; an empty string is
    /// rejected rather than treated as an empty store. Invalid characters
    /// are caught by the per-frame VLQ decode below, which is what names
    /// the 1-based frame index an error occurred in.
    pub fn decode_string(
        &mut self,
        mappings: &str,
        offsets: RebaseOffsets,
    ) -> Result<(), SourceMapError> {
        if mappings.is_empty() {
            return Err(SourceMapError::EmptyMappings);
        }

        let prior_len = self.lines.len() as i64;
        let mut offset = DeltaOffset::new();
        let mut new_lines = Vec::new();

        for (i, frame) in mappings.split(';').enumerate() {
            offset.reset_line();
            let frame_number = i + 1;

            if frame.is_empty() {
                new_lines.push(Line::Absent);
                continue;
            }

            let generated_line = (prior_len + i as i64 + 1) as u32;
            let mut segments = Vec::new();
            for raw in frame.split(',') {
                let deltas = vlq::decode_many(raw)
                    .map_err(|source| wrap_frame(frame_number, source))?;
                let mut segment =
                    segment::decode_segment(&deltas, &mut offset, generated_line, frame_number)?;
                segment.source_index = (segment.source_index as i64 + offsets.sources) as u32;
                if let Some(name_index) = segment.name_index {
                    segment.name_index = Some((name_index as i64 + offsets.name) as u32);
                }
                segments.push(segment);
            }
            new_lines.push(Line::Present(segments));
        }

        self.lines.extend(new_lines);
        Ok(())
    }

    /// Decode a pre-structured array form: each entry is either JSON
    /// `null` (an absent line) or a JSON array of fully-resolved segment
    /// objects (1-based fields, not wire deltas). Unlike `decode_string`,
    /// fields here are validated but never delta-decoded.
    pub fn decode_array(
        &mut self,
        lines: &[serde_json::Value],
        offsets: RebaseOffsets,
    ) -> Result<(), SourceMapError> {
        let prior_len = self.lines.len() as i64;
        let mut new_lines = Vec::with_capacity(lines.len());

        for (i, entry) in lines.iter().enumerate() {
            let line_number = i + 1;
            match entry {
                serde_json::Value::Null => new_lines.push(Line::Absent),
                serde_json::Value::Array(items) => {
                    let mut segments = Vec::with_capacity(items.len());
                    for item in items {
                        let mut segment = segment_from_json(item, line_number)?;
                        segment.validate(line_number)?;
                        segment.source_index = (segment.source_index as i64 + offsets.sources) as u32;
                        if let Some(name_index) = segment.name_index {
                            segment.name_index = Some((name_index as i64 + offsets.name) as u32);
                        }
                        segment.generated_line = (i as i64 + 1 + prior_len) as u32;
                        segments.push(segment);
                    }
                    new_lines.push(Line::Present(segments));
                }
                other => {
                    return Err(SourceMapError::NotAList {
                        line: line_number,
                        kind: json_kind(other),
                    })
                }
            }
        }

        self.lines.extend(new_lines);
        Ok(())
    }

    /// Append another store's lines directly, rebasing indices the same
    /// way `decode_string`/`decode_array` do. Segments are assumed
    /// already validated (they came from a `MappingStore`), so no
    /// re-validation happens here.
    pub fn decode_from(&mut self, other: &MappingStore, offsets: RebaseOffsets) {
        let prior_len = self.lines.len() as i64;
        let mut new_lines = Vec::with_capacity(other.lines.len());

        for (i, line) in other.lines.iter().enumerate() {
            match line {
                Line::Absent => new_lines.push(Line::Absent),
                Line::Present(segments) => {
                    let generated_line = (prior_len + i as i64 + 1) as u32;
                    let rebased = segments
                        .iter()
                        .map(|segment| {
                            let mut segment = *segment;
                            segment.generated_line = generated_line;
                            segment.source_index =
                                (segment.source_index as i64 + offsets.sources) as u32;
                            if let Some(name_index) = segment.name_index {
                                segment.name_index = Some((name_index as i64 + offsets.name) as u32);
                            }
                            segment
                        })
                        .collect();
                    new_lines.push(Line::Present(rebased));
                }
            }
        }

        self.lines.extend(new_lines);
    }

    /// Re-encode the whole store back to a Base64-VLQ mappings string.
    ///
    /// `decode_string(encode())` reproduces the same segment sequence;
    /// the stored line index (not any field on a `Segment`) is what
    /// carries frame boundary information.
    pub fn encode(&self) -> String {
        let mut offset = DeltaOffset::new();
        let mut result = String::new();

        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                result.push(';');
            }
            offset.reset_line();
            if let Line::Present(segments) = line {
                for (j, segment) in segments.iter().enumerate() {
                    if j > 0 {
                        result.push(',');
                    }
                    let deltas = segment::encode_segment(segment, &mut offset);
                    result.push_str(&vlq::encode_many(&deltas));
                }
            }
        }

        result
    }

    /// Binary search for the segment at 1-based `(line, column)`,
    /// applying `bias` when there is no exact column match.
    pub fn get_by_generated(&self, line: u32, column: u32, bias: Bias) -> Option<Segment> {
        let index = line.checked_sub(1)? as usize;
        let segments = match self.lines.get(index)? {
            Line::Absent => return None,
            Line::Present(segments) => segments,
        };
        search_by_generated_column(segments, column, bias)
    }

    /// Linear scan for the segment at 1-based `(source_line, source_column)`
    /// within `source_index`, applying `bias` when there is no exact
    /// column match. See [`MappingStore::build_original_index`] for an
    /// O(log n) alternative when doing many reverse queries.
    pub fn get_by_original(
        &self,
        source_line: u32,
        source_column: u32,
        source_index: u32,
        bias: Bias,
    ) -> Option<Segment> {
        let mut floor_best: Option<Segment> = None;
        let mut ceil_best: Option<Segment> = None;

        for line in &self.lines {
            let Line::Present(segments) = line else {
                continue;
            };
            for segment in segments {
                if segment.source_index != source_index || segment.source_line != source_line {
                    continue;
                }
                if segment.source_column == source_column {
                    return Some(*segment);
                }
                match bias {
                    Bias::Exact => {}
                    Bias::Floor if segment.source_column < source_column => {
                        if floor_best.map_or(true, |best| segment.source_column > best.source_column) {
                            floor_best = Some(*segment);
                        }
                    }
                    Bias::Ceil if segment.source_column > source_column => {
                        if ceil_best.map_or(true, |best| segment.source_column < best.source_column) {
                            ceil_best = Some(*segment);
                        }
                    }
                    _ => {}
                }
            }
        }

        match bias {
            Bias::Exact => None,
            Bias::Floor => floor_best,
            Bias::Ceil => ceil_best,
        }
    }

    /// Bucket every segment by `(source_index, source_line)`, sorted
    /// ascending by `source_column` within each bucket. Absent lines
    /// contribute nothing. Not maintained incrementally — rebuild after
    /// further decoding.
    pub fn build_original_index(&self) -> OriginalIndex {
        let mut buckets: BTreeMap<(u32, u32), Vec<Segment>> = BTreeMap::new();
        for line in &self.lines {
            let Line::Present(segments) = line else {
                continue;
            };
            for segment in segments {
                buckets
                    .entry((segment.source_index, segment.source_line))
                    .or_default()
                    .push(*segment);
            }
        }
        for bucket in buckets.values_mut() {
            bucket.sort_by_key(|segment| segment.source_column);
        }
        OriginalIndex { buckets }
    }
}

fn wrap_frame(frame: usize, source: SourceMapError) -> SourceMapError {
    SourceMapError::Frame {
        frame,
        source: Box::new(source),
    }
}

fn search_by_generated_column(segments: &[Segment], target: u32, bias: Bias) -> Option<Segment> {
    if segments.is_empty() {
        return None;
    }
    let mut lo: i64 = 0;
    let mut hi: i64 = segments.len() as i64 - 1;

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let column = segments[mid as usize].generated_column;
        if column == target {
            return Some(segments[mid as usize]);
        } else if column < target {
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }

    match bias {
        Bias::Exact => None,
        Bias::Floor => (hi >= 0).then(|| segments[hi as usize]),
        Bias::Ceil => ((lo as usize) < segments.len()).then(|| segments[lo as usize]),
    }
}

#[derive(serde::Deserialize)]
struct RawSegment {
    generated_line: u32,
    generated_column: u32,
    source_line: u32,
    source_column: u32,
    source_index: u32,
    #[serde(default)]
    name_index: Option<u32>,
}

fn segment_from_json(value: &serde_json::Value, line: usize) -> Result<Segment, SourceMapError> {
    let raw: RawSegment = serde_json::from_value(value.clone()).map_err(|e| {
        SourceMapError::InvalidEnvelope {
            reason: format!("line {line}: {e}"),
        }
    })?;
    Ok(Segment {
        generated_line: raw.generated_line,
        generated_column: raw.generated_column,
        source_line: raw.source_line,
        source_column: raw.source_column,
        source_index: raw.source_index,
        name_index: raw.name_index,
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_single_segment() {
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
    fn round_trip_nontrivial_string() {
        let mut store = MappingStore::new();
        let original = "AAAA;AACA,AADA;AAGA;";
        store.decode_string(original, RebaseOffsets::default()).unwrap();
        assert_eq!(store.encode(), original);
    }

    #[test]
    fn absent_frames_preserved() {
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
    fn name_offset_is_applied() {
        let mut store = MappingStore::new();
        let offsets = RebaseOffsets {
            name: 3,
            ..Default::default()
        };
        store.decode_string("AAAAE", offsets).unwrap();
        let Line::Present(segments) = &store.lines()[0] else {
            panic!("expected present line");
        };
        assert_eq!(segments[0].name_index, Some(5));
    }

    #[test]
    fn empty_string_is_an_error() {
        let mut store = MappingStore::new();
        let err = store.decode_string("", RebaseOffsets::default()).unwrap_err();
        assert_eq!(err, SourceMapError::EmptyMappings);
    }

    #[test]
    fn invalid_character_names_char_and_frame() {
        let mut store = MappingStore::new();
        let err = store
            .decode_string("AAAA;A#A", RebaseOffsets::default())
            .unwrap_err();
        assert_eq!(
            err,
            SourceMapError::Frame {
                frame: 2,
                source: Box::new(SourceMapError::InvalidCharacter {
                    character: '#',
                    offset: 1,
                }),
            }
        );
    }

    #[test]
    fn generated_lookup_with_bias() {
        let mut store = MappingStore::new();
        store
            .decode_string("AAAA,IAAA,IAAA", RebaseOffsets::default())
            .unwrap();
        // columns decoded: 0, 4, 8 -> 1-based 1, 5, 9
        assert_eq!(
            store.get_by_generated(1, 5, Bias::Exact).unwrap().generated_column,
            5
        );
        assert_eq!(
            store.get_by_generated(1, 6, Bias::Floor).unwrap().generated_column,
            5
        );
        assert_eq!(
            store.get_by_generated(1, 6, Bias::Ceil).unwrap().generated_column,
            9
        );
        assert!(store.get_by_generated(1, 6, Bias::Exact).is_none());
    }

    #[test]
    fn original_lookup_with_bias() {
        let mut store = MappingStore::new();
        // three segments at source col 1, 5, 10 (same source_index/line)
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
        assert!(store.get_by_original(1, 6, 0, Bias::Exact).is_none());
    }

    #[test]
    fn original_index_groups_and_sorts() {
        let mut store = MappingStore::new();
        store
            .decode_string("AAAA,AAAI,AAAK", RebaseOffsets::default())
            .unwrap();
        let index = store.build_original_index();
        let bucket = index.lookup(0, 1);
        let columns: Vec<u32> = bucket.iter().map(|s| s.source_column).collect();
        assert_eq!(columns, vec![1, 5, 10]);
    }

    #[test]
    fn decode_array_structural_error_names_kind() {
        let mut store = MappingStore::new();
        let lines = vec![serde_json::json!("not a list or null")];
        let err = store
            .decode_array(&lines, RebaseOffsets::default())
            .unwrap_err();
        assert_eq!(
            err,
            SourceMapError::NotAList {
                line: 1,
                kind: "string",
            }
        );
    }

    #[test]
    fn decode_array_accepts_null_and_lists() {
        let mut store = MappingStore::new();
        let lines = vec![
            serde_json::Value::Null,
            serde_json::json!([{
                "generated_line": 2,
                "generated_column": 1,
                "source_line": 1,
                "source_column": 1,
                "source_index": 0,
                "name_index": null,
            }]),
        ];
        store.decode_array(&lines, RebaseOffsets::default()).unwrap();
        assert_eq!(store.lines()[0], Line::Absent);
        let Line::Present(segments) = &store.lines()[1] else {
            panic!("expected present line");
        };
        assert_eq!(segments[0].generated_line, 2);
    }
}
