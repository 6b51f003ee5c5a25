use crate::geometry::Pos;
use thiserror::Error;

/// Recoverable domain errors raised by [`crate::board::Board::place`].
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum BoardError {
    #[error("cell ({}, {}) is already occupied", .0.x, .0.y)]
    CellOccupied(Pos),
    #[error("coordinate ({}, {}) is outside the board", .0.x, .0.y)]
    InvalidCoordinate(Pos),
}
