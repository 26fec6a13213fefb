//! The Source Map Facade: the JSON envelope plus the surrounding
//! `sources`/`names`/`sourcesContent` tables wrapped around a
//! [`MappingStore`], and map composition (`concat`).

use serde::{Deserialize, Serialize};

use crate::bias::Bias;
use crate::error::SourceMapError;
use crate::segment::Segment;
use crate::store::{MappingStore, RebaseOffsets};

/// The Source Map v3 JSON envelope, as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SourceMapV3 {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(rename = "sourceRoot", skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    pub sources: Vec<String>,
    #[serde(rename = "sourcesContent", skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

/// Base result of a position lookup: a resolved segment enriched with the
/// source path/content/name it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionResult {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source_line: u32,
    pub source_column: u32,
    pub source_index: u32,
    /// `sources[source_index]`, empty if out of range.
    pub source_path: String,
    /// Populated only when `sourcesContent[source_index]` exists.
    pub source_content: Option<String>,
    pub name_index: Option<u32>,
    /// Populated iff `name_index` is present and refers to a valid entry.
    pub name: Option<String>,
}

/// One line of surrounding source, used in [`PositionResultWithCode`].
#[derive(Debug, Clone, PartialEq)]
pub struct CodeLine {
    pub line_number: usize,
    pub content: String,
}

/// A [`PositionResult`] plus a window of surrounding source lines.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionResultWithCode {
    pub position: PositionResult,
    pub code_context: Vec<CodeLine>,
}

/// How many lines of context to include around a matched source line.
/// Defaults to 2 lines before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeContextOptions {
    pub lines_before: usize,
    pub lines_after: usize,
}

impl Default for CodeContextOptions {
    fn default() -> Self {
        Self {
            lines_before: 2,
            lines_after: 2,
        }
    }
}

/// A decoded Source Map v3, owning its own [`MappingStore`] and envelope
/// arrays. Mutating operations (`decode_*`, `concat`) never affect any
/// other `SourceMap` — composition always copies.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    file: Option<String>,
    source_root: Option<String>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    names: Vec<String>,
    store: MappingStore,
}

impl SourceMap {
    /// Parse a Source Map v3 envelope from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SourceMapError> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| {
            SourceMapError::InvalidEnvelope {
                reason: format!("invalid JSON: {e}"),
            }
        })?;
        Self::from_value(value)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, SourceMapError> {
        let object = value.as_object().ok_or_else(|| SourceMapError::InvalidEnvelope {
            reason: "envelope must be a JSON object".to_string(),
        })?;

        if !object.get("version").is_some_and(serde_json::Value::is_number) {
            return Err(SourceMapError::InvalidEnvelope {
                reason: "`version` must be present and numeric".to_string(),
            });
        }
        if !object.get("sources").is_some_and(serde_json::Value::is_array) {
            return Err(SourceMapError::InvalidEnvelope {
                reason: "`sources` must be a list".to_string(),
            });
        }
        if !object.get("mappings").is_some_and(serde_json::Value::is_string) {
            return Err(SourceMapError::InvalidEnvelope {
                reason: "`mappings` must be a string".to_string(),
            });
        }

        let envelope: SourceMapV3 = serde_json::from_value(value)
            .map_err(|e| SourceMapError::InvalidEnvelope { reason: e.to_string() })?;
        Self::from_envelope(envelope)
    }

    /// Build a `SourceMap` from an already-parsed envelope, decoding its
    /// `mappings` string into a fresh [`MappingStore`].
    pub fn from_envelope(envelope: SourceMapV3) -> Result<Self, SourceMapError> {
        let sources = envelope.sources.iter().map(|s| normalize_path(s)).collect();
        let file = envelope.file.as_deref().map(normalize_path);
        let source_root = envelope.source_root.as_deref().map(normalize_path);
        let sources_content = envelope.sources_content.unwrap_or_default();

        let mut store = MappingStore::new();
        store.decode_string(&envelope.mappings, RebaseOffsets::default())?;

        Ok(Self {
            file,
            source_root,
            sources,
            sources_content,
            names: envelope.names,
            store,
        })
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn source_root(&self) -> Option<&str> {
        self.source_root.as_deref()
    }

    pub fn generated_line_count(&self) -> usize {
        self.store.line_count()
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    fn to_position(&self, segment: Segment) -> PositionResult {
        let source_path = self
            .sources
            .get(segment.source_index as usize)
            .cloned()
            .unwrap_or_default();
        let source_content = self
            .sources_content
            .get(segment.source_index as usize)
            .cloned()
            .flatten();
        let name = segment
            .name_index
            .and_then(|index| self.names.get(index as usize).cloned());

        PositionResult {
            generated_line: segment.generated_line,
            generated_column: segment.generated_column,
            source_line: segment.source_line,
            source_column: segment.source_column,
            source_index: segment.source_index,
            source_path,
            source_content,
            name_index: segment.name_index,
            name,
        }
    }

    /// Look up the original position for a 1-based generated `(line, column)`.
    pub fn get_by_generated(&self, line: u32, column: u32, bias: Bias) -> Option<PositionResult> {
        self.store
            .get_by_generated(line, column, bias)
            .map(|segment| self.to_position(segment))
    }

    /// Look up the generated position for a 1-based original
    /// `(source_line, source_column)` within `source_index`.
    pub fn get_by_original(
        &self,
        source_line: u32,
        source_column: u32,
        source_index: u32,
        bias: Bias,
    ) -> Option<PositionResult> {
        self.store
            .get_by_original(source_line, source_column, source_index, bias)
            .map(|segment| self.to_position(segment))
    }

    /// As [`SourceMap::get_by_generated`], but also returns a window of
    /// surrounding source lines from `sourcesContent`.
    ///
    /// Returns `None` if there is no matching segment, or if the matched
    /// source has no inline content.
    pub fn get_by_generated_with_code(
        &self,
        line: u32,
        column: u32,
        bias: Bias,
        options: CodeContextOptions,
    ) -> Option<PositionResultWithCode> {
        let position = self.get_by_generated(line, column, bias)?;
        let content = position.source_content.as_ref()?;

        let normalized = content.replace("\r\n", "\n");
        let lines: Vec<&str> = normalized.split('\n').collect();
        let total_lines = lines.len() as u32;

        let start = position.source_line.saturating_sub(options.lines_before as u32).max(1);
        let end = (position.source_line + options.lines_after as u32).min(total_lines);

        let mut code_context = Vec::new();
        let mut i = start;
        while i <= end {
            let content = lines.get((i - 1) as usize).copied().unwrap_or("").to_string();
            code_context.push(CodeLine {
                line_number: i as usize,
                content,
            });
            i += 1;
        }

        Some(PositionResultWithCode {
            position,
            code_context,
        })
    }

    /// Append each of `others` after `self`, as if their generated files
    /// had been concatenated vertically. Rebases `sources`/`names`
    /// indices and the mapping store's generated lines; never mutates any
    /// of `others`.
    pub fn concat(&mut self, others: &[&SourceMap]) -> Result<(), SourceMapError> {
        for other in others {
            let name_off = self.names.len() as i64;
            let src_off = self.sources.len() as i64;

            self.names.extend(other.names.iter().cloned());
            self.sources.extend(other.sources.iter().cloned());

            // Keep sources_content aligned with sources on both sides of
            // the append: pad self up to its prior source count, then pad
            // the appended slice up to the other map's source count.
            self.sources_content.resize(src_off as usize, None);
            let mut appended_content = other.sources_content.clone();
            appended_content.resize(other.sources.len(), None);
            self.sources_content.extend(appended_content);

            let offsets = RebaseOffsets {
                name: name_off,
                sources: src_off,
            };
            self.store.decode_from(&other.store, offsets);
        }
        Ok(())
    }

    /// Serialize back to a wire-format envelope.
    pub fn to_envelope(&self) -> SourceMapV3 {
        let sources_content = if self.sources_content.iter().any(Option::is_some) {
            Some(self.sources_content.clone())
        } else {
            None
        };

        SourceMapV3 {
            version: 3,
            file: self.file.clone(),
            source_root: self.source_root.clone(),
            sources: self.sources.clone(),
            sources_content,
            names: self.names.clone(),
            mappings: self.store.encode(),
        }
    }

    pub fn to_json(&self) -> Result<String, SourceMapError> {
        serde_json::to_string(&self.to_envelope())
            .map_err(|e| SourceMapError::InvalidEnvelope { reason: e.to_string() })
    }

    pub fn to_json_pretty(&self) -> Result<String, SourceMapError> {
        serde_json::to_string_pretty(&self.to_envelope())
            .map_err(|e| SourceMapError::InvalidEnvelope { reason: e.to_string() })
    }

    /// A fully independent deep copy: separate arrays and mapping store.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }
}

/// Convert a path to forward-slash form and collapse duplicate slashes.
///
/// Kept intentionally minimal — full path normalization (drive letters,
/// `.`/`..` segments, URL vs. filesystem semantics) belongs to callers
/// that know which of those conventions applies to their sources.
fn normalize_path(path: &str) -> String {
    let forward = path.replace('\\', "/");
    let mut result = String::with_capacity(forward.len());
    let mut prev_was_slash = false;
    for c in forward.chars() {
        if c == '/' {
            if prev_was_slash {
                continue;
            }
            prev_was_slash = true;
        } else {
            prev_was_slash = false;
        }
        result.push(c);
    }
    result
}
