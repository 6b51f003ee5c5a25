//! Candidate move generation and move ordering.
//!
//! Candidates are restricted to empty cells within a small Chebyshev radius of existing stones:
//! far-away empty cells essentially never matter in a connect-style game, and pruning them keeps
//! branching factor sane on large boards.

use arrayvec::ArrayVec;
use board::geometry::MAX_CELLS;
use board::{detect_threats, Board, Player, Pos, ThreatKind};
use itertools::Itertools;

/// Radius (in Chebyshev distance) around existing stones that candidate moves are drawn from.
const CANDIDATE_RADIUS: usize = 2;

pub fn candidate_moves(board: &Board) -> Vec<Pos> {
    let cfg = board.config();
    if board.move_count() == 0 {
        return vec![cfg.center()];
    }
    let neighborhood = board.occupied().extended_moore_neighbors(cfg, CANDIDATE_RADIUS);
    let empty = board.bitboard(Player::None);
    (neighborhood & empty).ones(cfg).collect()
}

pub(crate) type HistScoreT = i16;
const HIST_DIVISOR: HistScoreT = 1024;

/// History Gravity: scales the applied bonus/malus down as a cell's score saturates, keeping
/// history scores bounded without a hard clamp on every update.
fn update_history_score(entry: &mut HistScoreT, bonus: HistScoreT) {
    let bonus = bonus.clamp(-HIST_DIVISOR, HIST_DIVISOR) as i32;
    let e = *entry as i32;
    let scaled = (bonus - bonus.abs() * e / HIST_DIVISOR as i32) as i16;
    *entry += scaled;
}

/// Per-player history heuristic: how often a move to a given cell has caused a beta cutoff.
#[derive(Debug, Clone)]
pub struct HistoryHeuristic(Box<[[HistScoreT; MAX_CELLS]; 2]>);

impl Default for HistoryHeuristic {
    fn default() -> Self {
        Self(Box::new([[0; MAX_CELLS]; 2]))
    }
}

impl HistoryHeuristic {
    fn slot(player: Player) -> usize {
        match player {
            Player::Red => 0,
            Player::Blue => 1,
            Player::None => unreachable!("history is only tracked for the side that moved"),
        }
    }

    pub fn update(&mut self, player: Player, cfg: board::BoardConfig, pos: Pos, bonus: HistScoreT) {
        update_history_score(&mut self.0[Self::slot(player)][cfg.index_of(pos)], bonus);
    }

    pub fn score(&self, player: Player, cfg: board::BoardConfig, pos: Pos) -> i32 {
        self.0[Self::slot(player)][cfg.index_of(pos)] as i32
    }

    pub fn clear(&mut self) {
        for row in self.0.iter_mut() {
            row.fill(0);
        }
    }
}

/// Two killer moves per ply: quiet moves that caused a cutoff at this depth in a sibling node.
#[derive(Debug, Clone, Copy, Default)]
pub struct Killers([Option<Pos>; 2]);

impl Killers {
    pub fn add(&mut self, pos: Pos) {
        if self.0[0] != Some(pos) {
            self.0[1] = self.0[0];
            self.0[0] = Some(pos);
        }
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.0.contains(&Some(pos))
    }
}

/// Forcing moves, ranked win-now above block above own-extension: gain squares of the side to
/// move's own straight/broken fours (an immediate win) first, then the gain squares that block the
/// opponent's straight/broken fours, then the side to move's own straight threes.
fn forcing_moves(board: &Board, side_to_move: Player) -> Vec<Pos> {
    let opponent = side_to_move.opposite();
    let own = detect_threats(board, side_to_move);
    let theirs = detect_threats(board, opponent);

    let mut moves = Vec::new();
    let mut push_unique = |pos: Pos, moves: &mut Vec<Pos>| {
        if !moves.contains(&pos) {
            moves.push(pos);
        }
    };
    for kind in [ThreatKind::StraightFour, ThreatKind::BrokenFour] {
        for threat in own.iter().filter(|t| t.kind == kind) {
            for &sq in &threat.gain_squares {
                push_unique(sq, &mut moves);
            }
        }
    }
    for kind in [ThreatKind::StraightFour, ThreatKind::BrokenFour] {
        for threat in theirs.iter().filter(|t| t.kind == kind) {
            for &sq in &threat.gain_squares {
                push_unique(sq, &mut moves);
            }
        }
    }
    for threat in own.iter().filter(|t| t.kind == ThreatKind::StraightThree) {
        for &sq in &threat.gain_squares {
            push_unique(sq, &mut moves);
        }
    }
    moves
}

/// Assigns each candidate a priority: TT move first, then forcing moves, then killers, then
/// history heuristic. Picks in descending-score order via swap-remove-max, mirroring a classic
/// staged move picker.
pub struct MovePicker {
    moves: ArrayVec<Pos, MAX_CELLS>,
    scores: ArrayVec<i32, MAX_CELLS>,
}

impl MovePicker {
    pub fn new(
        board: &Board,
        side_to_move: Player,
        tt_move: Option<Pos>,
        killers: Killers,
        history: &HistoryHeuristic,
    ) -> Self {
        let candidates = candidate_moves(board);
        let forcing = forcing_moves(board, side_to_move);
        let cfg = board.config();

        let mut moves = ArrayVec::new();
        let mut scores = ArrayVec::new();
        for pos in candidates {
            let score = if Some(pos) == tt_move {
                1_000_000
            } else if let Some(rank) = forcing.iter().position(|&p| p == pos) {
                // earlier entries in `forcing` are stronger threats; rank them above killers.
                500_000 - rank as i32
            } else if killers.contains(pos) {
                100_000
            } else {
                history.score(side_to_move, cfg, pos)
            };
            moves.push(pos);
            scores.push(score);
        }
        Self { moves, scores }
    }

    pub fn next(&mut self) -> Option<(Pos, i32)> {
        let idx = self.scores.iter().position_max()?;
        Some((self.moves.swap_remove(idx), self.scores.swap_remove(idx)))
    }
}

impl Iterator for MovePicker {
    type Item = (Pos, i32);

    fn next(&mut self) -> Option<Self::Item> {
        MovePicker::next(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board::BoardConfig;

    #[test]
    fn first_move_on_empty_board_is_center() {
        let cfg = BoardConfig::default();
        let board = Board::empty(cfg);
        assert_eq!(candidate_moves(&board), vec![cfg.center()]);
    }

    #[test]
    fn candidates_stay_near_existing_stones() {
        let cfg = BoardConfig::default();
        let board = Board::empty(cfg).place(Pos::new(0, 0), Player::Red).unwrap();
        let candidates = candidate_moves(&board);
        assert!(candidates.iter().all(|p| p.x <= CANDIDATE_RADIUS as u8 && p.y <= CANDIDATE_RADIUS as u8));
        assert!(!candidates.contains(&Pos::new(0, 0)), "occupied cells are not candidates");
    }

    #[test]
    fn tt_move_is_picked_first() {
        let cfg = BoardConfig::default();
        let board = Board::empty(cfg).place(Pos::new(7, 7), Player::Red).unwrap();
        let tt_move = Pos::new(8, 8);
        let mut picker = MovePicker::new(&board, Player::Blue, Some(tt_move), Killers::default(), &HistoryHeuristic::default());
        let (first, _) = picker.next().unwrap();
        assert_eq!(first, tt_move);
    }

    #[test]
    fn history_gravity_keeps_scores_bounded() {
        let mut hist = HistoryHeuristic::default();
        let cfg = BoardConfig::default();
        let pos = Pos::new(4, 4);
        for _ in 0..10_000 {
            hist.update(Player::Red, cfg, pos, HIST_DIVISOR);
        }
        assert!(hist.score(Player::Red, cfg, pos) <= HIST_DIVISOR as i32);
    }
}
