//! Source Map v3 codec and position-query engine.
//!
//! Four layers, each built on the one below:
//!
//! - [`vlq`] — Base64-VLQ integer encode/decode.
//! - [`segment`] — wire delta vectors <-> resolved [`segment::Segment`] records.
//! - [`store`] — an ordered, line-indexed [`store::MappingStore`]: decode,
//!   re-encode, and the two position lookups.
//! - [`facade`] — the JSON envelope and [`facade::SourceMap`], the type
//!   most callers want.
//!
//! ```
//! use srcmap_core::{Bias, SourceMap};
//!
//! let json = r#"{
//!     "version": 3,
//!     "sources": ["main.js"],
//!     "names": ["add"],
//!     "mappings": "AAAAA"
//! }"#;
//!
//! let map = SourceMap::from_json(json).unwrap();
//! let position = map.get_by_generated(1, 1, Bias::Exact).unwrap();
//! assert_eq!(position.source_path, "main.js");
//! assert_eq!(position.name.as_deref(), Some("add"));
//! ```

pub mod bias;
pub mod error;
pub mod facade;
pub mod segment;
pub mod store;
pub mod vlq;

pub use bias::Bias;
pub use error::{Result, SourceMapError};
pub use facade::{CodeContextOptions, CodeLine, PositionResult, PositionResultWithCode, SourceMap, SourceMapV3};
pub use segment::Segment;
pub use store::{MappingStore, OriginalIndex, RebaseOffsets};
