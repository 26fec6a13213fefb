//! The Segment Codec: converts between wire-format delta vectors and
//! fully resolved, 1-based `Segment` records, threading a mutable running
//! offset through the conversion.

use crate::error::SourceMapError;

/// A single mapping point, fully resolved to 1-based coordinates.
///
/// `name_index` being `None` is semantically distinct from `Some(0)` — the
/// wire form expresses this as a 4-field vs. 5-field segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source_line: u32,
    pub source_column: u32,
    pub source_index: u32,
    pub name_index: Option<u32>,
}

impl Segment {
    /// Validate the fields required before a segment is accepted into a
    /// store: all four positional fields must be at least 1.
    ///
    /// `frame` is the 1-based frame/line index, used only to annotate the
    /// error; it plays no role in the check itself.
    pub fn validate(&self, frame: usize) -> Result<(), SourceMapError> {
        let checks: [(&'static str, i64); 4] = [
            ("generated_line", self.generated_line as i64),
            ("generated_column", self.generated_column as i64),
            ("source_line", self.source_line as i64),
            ("source_column", self.source_column as i64),
        ];
        for (field, value) in checks {
            if value < 1 {
                return Err(SourceMapError::InvalidSegmentField {
                    frame,
                    field,
                    value,
                    reason: "must be >= 1",
                });
            }
        }
        Ok(())
    }
}

/// The running 0-based delta offset threaded through segment encode/decode.
///
/// Stack-allocated; no heap allocation per segment. A fresh `DeltaOffset`
/// is created at the start of every `decode_string`/`decode_array`/
/// `encode` call — it never persists across separate calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaOffset {
    pub generated_column: i64,
    pub source_line: i64,
    pub source_column: i64,
    pub source_index: i64,
    pub name_index: i64,
}

impl DeltaOffset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-line component of the offset. Called at the start of
    /// every generated line, both when decoding and when encoding.
    pub fn reset_line(&mut self) {
        self.generated_column = 0;
    }
}

/// Decode one segment's delta vector (length 4 or 5) into a 1-based
/// `Segment`, mutating `offset` in place.
///
/// `generated_line` is supplied by the caller (the Mapping Store advances
/// it at frame boundaries) since it is never itself delta-encoded.
pub fn decode_segment(
    deltas: &[i64],
    offset: &mut DeltaOffset,
    generated_line: u32,
    frame: usize,
) -> Result<Segment, SourceMapError> {
    if deltas.len() != 4 && deltas.len() != 5 {
        return Err(SourceMapError::InvalidSegmentLength {
            frame,
            length: deltas.len(),
        });
    }

    offset.generated_column += deltas[0];
    offset.source_index += deltas[1];
    offset.source_line += deltas[2];
    offset.source_column += deltas[3];

    let name_index = if deltas.len() == 5 {
        offset.name_index += deltas[4];
        Some(offset.name_index as u32)
    } else {
        None
    };

    let segment = Segment {
        generated_line,
        generated_column: (offset.generated_column + 1) as u32,
        source_line: (offset.source_line + 1) as u32,
        source_column: (offset.source_column + 1) as u32,
        source_index: offset.source_index as u32,
        name_index,
    };
    segment.validate(frame)?;
    Ok(segment)
}

/// Encode a 1-based `Segment` into its delta vector, mutating `offset` in
/// place to the segment's 0-based values.
///
/// Emits exactly 5 integers when `name_index` is present (including
/// `Some(0)`), 4 otherwise.
pub fn encode_segment(segment: &Segment, offset: &mut DeltaOffset) -> Vec<i64> {
    let gen_col = (segment.generated_column - 1) as i64;
    let src_line = (segment.source_line - 1) as i64;
    let src_col = (segment.source_column - 1) as i64;
    let src_idx = segment.source_index as i64;

    let mut deltas = vec![
        gen_col - offset.generated_column,
        src_idx - offset.source_index,
        src_line - offset.source_line,
        src_col - offset.source_column,
    ];

    offset.generated_column = gen_col;
    offset.source_index = src_idx;
    offset.source_line = src_line;
    offset.source_column = src_col;

    if let Some(name_idx) = segment.name_index {
        let name_idx = name_idx as i64;
        deltas.push(name_idx - offset.name_index);
        offset.name_index = name_idx;
    }

    deltas
}
