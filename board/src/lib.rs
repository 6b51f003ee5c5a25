//! Board representation, Zobrist hashing, threat classification and static evaluation for a
//! Gomoku-family game played under Caro rules (overlines do not win; a five blocked on both ends
//! does not win).

pub mod bitboard;
pub mod board;
pub mod error;
pub mod eval;
pub mod geometry;
pub mod threat;
pub mod zobrist;

pub use bitboard::Bitboard;
pub use board::Board;
pub use error::BoardError;
pub use eval::{evaluate, terminal_score, MATE};
pub use geometry::{BoardConfig, Player, Pos};
pub use threat::{detect_threats, Direction, Threat, ThreatKind};
