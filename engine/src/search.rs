//! Iterative-deepening alpha-beta negamax with aspiration windows, killer moves and history.
//!
//! A single call to [`search`] runs to completion or until `stop` is observed; callers that want
//! Lazy-SMP or pondering wrap this with their own thread/termination policy (see [`crate::parallel`]
//! and [`crate::ponder`]).

use crate::movegen::{HistoryHeuristic, Killers, MovePicker};
use crate::tt::{NodeType, TTEntry, TranspositionTable};
use board::{detect_threats, evaluate, terminal_score, Board, Player, Pos, ThreatKind, MATE};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

pub const MAX_PLY: usize = 128;

#[derive(Debug, Copy, Clone)]
pub struct SearchLimits {
    pub max_depth: u8,
    pub deadline: Option<Instant>,
    pub node_limit: Option<u64>,
    pub use_aspiration: bool,
    pub use_null_move_pruning: bool,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self { max_depth: MAX_PLY as u8, deadline: None, node_limit: None, use_aspiration: true, use_null_move_pruning: true }
    }
}

/// Depth reduction applied to the reduced-depth search after a null move.
const NULL_MOVE_REDUCTION: isize = 2;
/// Shallowest depth at which null-move pruning is attempted; below this the reduced search isn't
/// worth its own overhead.
const NULL_MOVE_MIN_DEPTH: isize = 3;

#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub best_move: Option<Pos>,
    pub score: i32,
    pub depth: u8,
    pub nodes: u64,
    pub pv: Vec<Pos>,
}

#[derive(Debug)]
enum Outcome {
    Won(Player),
    Draw,
}

fn terminal(board: &Board, side_to_move: Player) -> Option<Outcome> {
    if board.move_count() == 0 {
        return None;
    }
    let last_mover = side_to_move.opposite();
    if detect_threats(board, last_mover).iter().any(|t| t.kind == ThreatKind::Five) {
        return Some(Outcome::Won(last_mover));
    }
    if board.is_full() {
        return Some(Outcome::Draw);
    }
    None
}

/// Shared, cross-thread-visible node counter and stop flag; Lazy-SMP workers each hold a clone.
#[derive(Debug, Default)]
pub struct SearchShared {
    pub stop: AtomicBool,
    pub nodes: AtomicU64,
}

pub struct Searcher<'a> {
    tt: &'a TranspositionTable,
    shared: &'a SearchShared,
    limits: SearchLimits,
    history: HistoryHeuristic,
    killers: Vec<Killers>,
    local_nodes: u64,
    check_every: u64,
}

impl<'a> Searcher<'a> {
    pub fn new(tt: &'a TranspositionTable, shared: &'a SearchShared, limits: SearchLimits) -> Self {
        Self {
            tt,
            shared,
            limits,
            history: HistoryHeuristic::default(),
            killers: vec![Killers::default(); MAX_PLY],
            local_nodes: 0,
            check_every: 1024,
        }
    }

    fn should_stop(&self) -> bool {
        if self.shared.stop.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(limit) = self.limits.node_limit {
            if self.shared.nodes.load(Ordering::Relaxed) >= limit {
                return true;
            }
        }
        if let Some(deadline) = self.limits.deadline {
            if self.local_nodes % self.check_every == 0 && Instant::now() >= deadline {
                return true;
            }
        }
        false
    }

    /// Runs iterative deepening from `side_to_move`'s perspective up to `limits.max_depth` or until
    /// stopped; always returns the best complete iteration found so far.
    pub fn iterative_deepening(&mut self, board: &Board, side_to_move: Player) -> SearchResult {
        let mut result = SearchResult::default();
        let mut score = 0;
        let max_depth = self.limits.max_depth.min(MAX_PLY as u8).max(1);

        log::debug!("starting iterative deepening for {side_to_move} up to depth {max_depth}");
        for depth in 1..=max_depth {
            let mut pv = Vec::new();
            let iteration_score = self.aspiration(board, side_to_move, depth as isize, score, &mut pv);
            if self.shared.stop.load(Ordering::Relaxed) && depth > 1 {
                break;
            }
            score = iteration_score;
            result = SearchResult {
                best_move: pv.first().copied().or(result.best_move),
                score,
                depth,
                nodes: self.shared.nodes.load(Ordering::Relaxed),
                pv,
            };
            if score.abs() >= MATE - MAX_PLY as i32 {
                log::debug!("mate score found at depth {depth}, stopping early");
                break;
            }
        }
        result
    }

    /// Re-searches with a widening window around the previous iteration's score: the window
    /// widens by a factor of 4 each retry, and after 3 failed retries falls back to a full-width
    /// search rather than widening forever.
    fn aspiration(&mut self, board: &Board, side_to_move: Player, depth: isize, prev_score: i32, pv: &mut Vec<Pos>) -> i32 {
        if depth <= 2 || !self.limits.use_aspiration {
            return self.negamax(board, side_to_move, 0, depth, -MATE, MATE, pv);
        }
        let mut delta = 25;
        let mut alpha = (prev_score - delta).max(-MATE);
        let mut beta = (prev_score + delta).min(MATE);
        let mut retries = 0;
        loop {
            pv.clear();
            let score = self.negamax(board, side_to_move, 0, depth, alpha, beta, pv);
            if self.shared.stop.load(Ordering::Relaxed) {
                return score;
            }
            if score > alpha && score < beta {
                return score;
            }
            retries += 1;
            if retries > 3 {
                pv.clear();
                return self.negamax(board, side_to_move, 0, depth, -MATE, MATE, pv);
            }
            if score <= alpha {
                log::trace!("aspiration fail-low at depth {depth}, widening");
                alpha = (alpha - delta).max(-MATE);
            } else {
                log::trace!("aspiration fail-high at depth {depth}, widening");
                beta = (beta + delta).min(MATE);
            }
            delta *= 4;
        }
    }

    fn negamax(
        &mut self,
        board: &Board,
        side_to_move: Player,
        ply: usize,
        depth: isize,
        mut alpha: i32,
        beta: i32,
        pv: &mut Vec<Pos>,
    ) -> i32 {
        debug_assert!(alpha < beta);
        pv.clear();

        if let Some(outcome) = terminal(board, side_to_move) {
            // `terminal` only ever reports a win for the side that just moved, i.e. the opponent
            // of this node's side to move, so reaching this node at all is always a loss for it.
            return match outcome {
                Outcome::Won(_) => terminal_score(Some(false), ply as i32),
                Outcome::Draw => terminal_score(None, ply as i32),
            };
        }
        if depth <= 0 {
            return evaluate(board, side_to_move);
        }

        self.local_nodes += 1;
        self.shared.nodes.fetch_add(1, Ordering::Relaxed);

        let is_pv_node = beta - alpha > 1;
        let original_alpha = alpha;
        let tt_entry = self.tt.load(board.hash());
        if let Some(entry) = tt_entry {
            if !is_pv_node && entry.depth as isize >= depth {
                let score = entry.score as i32;
                let usable = match entry.bound() {
                    NodeType::Exact => true,
                    NodeType::FailHigh => score >= beta,
                    NodeType::FailLow => score <= alpha,
                };
                if usable {
                    return score;
                }
            }
        }

        // Null-move pruning: if skipping our turn entirely still produces a score at least beta,
        // an actual move (which can only help) almost certainly would too. There is no zugzwang
        // in this game the way there is in chess (placing an extra stone is never forced to be
        // bad), so this needs no verification search, only a minimum depth guard against pruning
        // away real tactics in shallow nodes.
        if self.limits.use_null_move_pruning
            && !is_pv_node
            && depth >= NULL_MOVE_MIN_DEPTH
            && board.move_count() > 0
            && evaluate(board, side_to_move) >= beta
        {
            let reduced_depth = depth - 1 - NULL_MOVE_REDUCTION;
            let mut null_pv = Vec::new();
            let null_score =
                -self.negamax(board, side_to_move.opposite(), ply + 1, reduced_depth, -beta, -beta + 1, &mut null_pv);
            if self.should_stop() {
                return 0;
            }
            if null_score >= beta && null_score.abs() < MATE - MAX_PLY as i32 {
                log::trace!("null-move cutoff at depth {depth}, ply {ply}");
                return null_score;
            }
        }

        let killers = self.killers[ply];
        let mut picker = MovePicker::new(board, side_to_move, tt_entry.and_then(|e| e.best_move()), killers, &self.history);

        let mut best_score = -MATE;
        let mut best_move = None;
        let mut child_pv = Vec::new();
        let mut moves_tried = 0;

        while let Some((mov, _)) = picker.next() {
            let child = match board.place(mov, side_to_move) {
                Ok(b) => b,
                Err(_) => continue,
            };
            moves_tried += 1;

            let score = -self.negamax(&child, side_to_move.opposite(), ply + 1, depth - 1, -beta, -alpha, &mut child_pv);

            if self.should_stop() {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = Some(mov);
                if score > alpha {
                    alpha = score;
                    pv.clear();
                    pv.push(mov);
                    pv.extend_from_slice(&child_pv);
                }
            }
            if alpha >= beta {
                if ply < self.killers.len() {
                    self.killers[ply].add(mov);
                }
                let cfg = board.config();
                self.history.update(side_to_move, cfg, mov, depth.clamp(0, i16::MAX as isize) as i16);
                break;
            }
        }

        if moves_tried == 0 {
            // no legal candidate cells even though the board is not full: fall back to a quiet eval
            return evaluate(board, side_to_move);
        }

        let bound = if best_score <= original_alpha {
            NodeType::FailLow
        } else if best_score >= beta {
            NodeType::FailHigh
        } else {
            NodeType::Exact
        };
        if let Some(mov) = best_move {
            let entry = TTEntry::new(board.hash(), best_score, best_score, mov, depth, bound, self.tt.age);
            self.tt.store(entry, board.hash());
        }
        best_score
    }
}

/// Searches `board` from `side_to_move`'s perspective, independent of how many stones are on the
/// board: callers that construct test or puzzle positions control whose turn it is directly,
/// rather than relying on the move count's parity.
pub fn search(board: &Board, side_to_move: Player, tt: &TranspositionTable, shared: &SearchShared, limits: SearchLimits) -> SearchResult {
    let mut searcher = Searcher::new(tt, shared, limits);
    searcher.iterative_deepening(board, side_to_move)
}
