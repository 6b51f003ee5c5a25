//! Victory-by-Continuous-Fours solver: an OR/AND threat-space search restricted to moves that
//! immediately create a four-threat (or a five).
//!
//! At every attacker move (an OR node: the attacker need only find one working continuation) we
//! only consider moves that create a `StraightFour`, `BrokenFour` or an outright `Five` — any
//! other move gives the defender a free tempo and falls outside VCF's scope by definition. If the
//! created four has two gain squares the defender cannot block both, so the position is already
//! won. Otherwise the defender has exactly one non-losing reply (an AND node with one child): play
//! anything else and the attacker completes a five immediately.

use crate::movegen::candidate_moves;
use board::{detect_threats, Board, Player, Pos, ThreatKind};
use itertools::Itertools;

#[derive(Debug, Clone)]
pub struct VcfResult {
    /// Alternating attacker/defender moves, starting and ending with an attacker move.
    pub line: Vec<Pos>,
}

#[derive(Debug, Copy, Clone)]
pub struct VcfLimits {
    pub max_depth: u32,
    pub max_nodes: u64,
}

impl Default for VcfLimits {
    fn default() -> Self {
        Self { max_depth: 40, max_nodes: 200_000 }
    }
}

/// Looks for a forced win for `attacker` using only four-threat moves. Returns `None` if no such
/// line was found within the node/depth budget — this does *not* mean no win exists, only that
/// this solver didn't find one.
pub fn solve(board: &Board, attacker: Player, limits: VcfLimits) -> Option<VcfResult> {
    let mut nodes = 0u64;
    search(board, attacker, limits, &mut nodes, limits.max_depth).map(|line| VcfResult { line })
}

fn search(board: &Board, attacker: Player, limits: VcfLimits, nodes: &mut u64, depth_budget: u32) -> Option<Vec<Pos>> {
    *nodes += 1;
    if *nodes > limits.max_nodes || depth_budget == 0 {
        return None;
    }
    let defender = attacker.opposite();

    for pos in candidate_moves(board) {
        let Ok(placed) = board.place(pos, attacker) else { continue };
        let threats = detect_threats(&placed, attacker);
        if threats.iter().any(|t| t.kind == ThreatKind::Five) {
            return Some(vec![pos]);
        }

        let gain_squares: Vec<Pos> = threats
            .iter()
            .filter(|t| matches!(t.kind, ThreatKind::StraightFour | ThreatKind::BrokenFour))
            .flat_map(|t| t.gain_squares.iter().copied())
            .unique()
            .collect();
        if gain_squares.is_empty() {
            continue; // not a forcing move, out of scope for a pure four-threat search
        }
        if gain_squares.len() >= 2 {
            return Some(vec![pos]); // double four: unstoppable
        }

        let block = gain_squares[0];
        let Ok(blocked) = placed.place(block, defender) else { continue };
        if let Some(mut rest) = search(&blocked, attacker, limits, nodes, depth_budget - 1) {
            let mut line = vec![pos, block];
            line.append(&mut rest);
            return Some(line);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use board::BoardConfig;

    #[test]
    fn finds_a_double_four_win_in_one_move() {
        let cfg = BoardConfig::default();
        // Red has XXXX with both flanks open: an unstoppable straight four.
        let board = Board::empty(cfg)
            .place(Pos::new(5, 7), Player::Red)
            .unwrap()
            .place(Pos::new(0, 0), Player::Blue)
            .unwrap()
            .place(Pos::new(6, 7), Player::Red)
            .unwrap()
            .place(Pos::new(0, 1), Player::Blue)
            .unwrap()
            .place(Pos::new(7, 7), Player::Red)
            .unwrap()
            .place(Pos::new(0, 2), Player::Blue)
            .unwrap()
            .place(Pos::new(8, 7), Player::Red)
            .unwrap()
            .place(Pos::new(0, 3), Player::Blue)
            .unwrap();
        let result = solve(&board, Player::Red, VcfLimits::default()).expect("an open four should be a forced win");
        assert_eq!(result.line.len(), 1);
    }

    #[test]
    fn finds_no_forced_win_on_an_empty_board() {
        let cfg = BoardConfig::default();
        let board = Board::empty(cfg);
        assert!(solve(&board, Player::Red, VcfLimits::default()).is_none());
    }

    #[test]
    fn resolves_a_broken_four_by_filling_its_gap() {
        let cfg = BoardConfig::default();
        // Red holds columns 5,6,7,9 on row 7 with a gap at column 8: a broken four whose single
        // gain square (8,7) both completes a five and is the forced reply to try first.
        let board = Board::empty(cfg)
            .place(Pos::new(5, 7), Player::Red)
            .unwrap()
            .place(Pos::new(0, 0), Player::Blue)
            .unwrap()
            .place(Pos::new(6, 7), Player::Red)
            .unwrap()
            .place(Pos::new(0, 1), Player::Blue)
            .unwrap()
            .place(Pos::new(7, 7), Player::Red)
            .unwrap()
            .place(Pos::new(0, 2), Player::Blue)
            .unwrap()
            .place(Pos::new(9, 7), Player::Red)
            .unwrap()
            .place(Pos::new(0, 3), Player::Blue)
            .unwrap();
        // cols 5,6,7,9 filled by red with a gap at col 8: a broken four with gain square (8,7).
        let result = solve(&board, Player::Red, VcfLimits::default());
        assert!(result.is_some(), "a broken four should still be a forced win if the resulting five holds");
    }
}
