//! Static position evaluation from threat counts.
//!
//! Non-terminal positions are scored heuristically from the per-player threat inventory;
//! terminal positions (a completed five, or a full board) are scored separately by
//! [`terminal_score`] so mate distance can be folded in by the caller.

use crate::board::Board;
use crate::geometry::Player;
use crate::threat::{detect_threats, ThreatKind};

/// Upper bound on evaluation magnitude; also the base terminal score before the ply discount.
pub const MATE: i32 = 30_000;

/// Heuristic weight per threat kind, approximating how close it is to forcing a win.
fn threat_weight(kind: ThreatKind) -> i32 {
    match kind {
        ThreatKind::Five => MATE, // never actually reached: a Five ends the game before eval runs
        ThreatKind::StraightFour => 10_000,
        ThreatKind::BrokenFour => 6_000,
        ThreatKind::StraightThree => 700,
        ThreatKind::BrokenThree => 200,
    }
}

fn threat_score(board: &Board, player: Player) -> i32 {
    detect_threats(board, player).iter().map(|t| threat_weight(t.kind)).sum()
}

/// A small bonus for stones near the board center, where lines have more room to develop.
fn positional_score(board: &Board, player: Player) -> i32 {
    let cfg = board.config();
    let center = cfg.center();
    board
        .bitboard(player)
        .ones(cfg)
        .map(|pos| {
            let dx = (pos.x as i32 - center.x as i32).abs();
            let dy = (pos.y as i32 - center.y as i32).abs();
            8 - dx.max(dy).min(8)
        })
        .sum()
}

/// Static evaluation of a non-terminal position from `side_to_move`'s perspective.
///
/// Antisymmetric: evaluating the same board from the opponent's perspective yields the negation,
/// since the score is built as `own - opponent` throughout.
pub fn evaluate(board: &Board, side_to_move: Player) -> i32 {
    debug_assert!(side_to_move.is_some());
    let opponent = side_to_move.opposite();
    let threats = threat_score(board, side_to_move) - threat_score(board, opponent);
    let position = positional_score(board, side_to_move) - positional_score(board, opponent);
    (threats + position).clamp(-(MATE - 1), MATE - 1)
}

/// Score for a position known to be over. `won` is from the perspective of the player the score
/// is reported for; `ply` is the distance from the search root, so closer mates/losses are
/// preferred/avoided over farther ones with the same nominal value.
pub fn terminal_score(won: Option<bool>, ply: i32) -> i32 {
    match won {
        Some(true) => MATE - ply,
        Some(false) => -(MATE - ply),
        None => 0, // board filled with no five: a draw
    }
}
