//! Lookup bias: what to return when a position query has no exact match.

/// Controls the fallback behavior of position lookups when there is no
/// segment at the exact requested column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bias {
    /// Only an exact column match is acceptable.
    #[default]
    Exact,
    /// Fall back to the greatest segment with a smaller column.
    Floor,
    /// Fall back to the least segment with a greater column.
    Ceil,
}
