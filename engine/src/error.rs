use thiserror::Error;

/// Recoverable errors surfaced by the engine crate, as opposed to invariant violations (which
/// `panic!` rather than return an `Err`, since they indicate an engine bug rather than bad input).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The root position has no candidate move even though the board is not full. Should never
    /// happen given the center-move fallback on an empty board, but kept as a named path rather
    /// than folded into a generic panic so a caller can log it distinctly if it ever does.
    #[error("search was asked to find a move with no legal candidates available")]
    NoLegalMove,
    /// The transposition table could not be allocated at the requested size.
    #[error("failed to allocate a transposition table of the requested size")]
    TtAllocFailed,
}
