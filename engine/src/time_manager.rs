//! Adaptive per-move time allocation.
//!
//! A PID-like controller over a single game's move history feeds a phase- and
//! position-complexity-aware base allocation: proportional error (how much of the clock has
//! burned down), an integral term (a decaying running total so a long stretch of underspending
//! earns time back) and a derivative term (the swing since the previous move) combine into a
//! "pressure" value that damps how aggressively the next move is allowed to spend. Two escape
//! hatches sit on top of the PID result: a time-scramble mode when the clock is getting short
//! relative to the increment, and an emergency mode when it's getting short in absolute terms.

use crate::config::Difficulty;
use board::{Board, Player};
use std::time::Duration;

/// Coarse stage of the game, derived from move number, that scales both how far ahead the budget
/// assumes the game still has to run and how much that per-move share is worth spending.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GamePhase {
    Opening,
    EarlyMid,
    LateMid,
    Endgame,
}

impl GamePhase {
    fn for_move(move_no: u32) -> Self {
        match move_no {
            0..=10 => GamePhase::Opening,
            11..=25 => GamePhase::EarlyMid,
            26..=45 => GamePhase::LateMid,
            _ => GamePhase::Endgame,
        }
    }

    /// Assumed number of this side's remaining moves before the game ends, used as the divisor
    /// for the base per-move allocation.
    fn moves_to_end(self) -> f64 {
        match self {
            GamePhase::Opening => 30.0,
            GamePhase::EarlyMid => 22.0,
            GamePhase::LateMid => 14.0,
            GamePhase::Endgame => 8.0,
        }
    }

    /// Multiplier on the base allocation: the midgame is where most of the tactics live, so it
    /// gets more than its even share; the opening (mostly book-shaped, wide-open positions) and
    /// the endgame (fewer, more forced replies) get less.
    fn modifier(self) -> f64 {
        match self {
            GamePhase::Opening => 0.8,
            GamePhase::EarlyMid => 1.0,
            GamePhase::LateMid => 1.1,
            GamePhase::Endgame => 1.3,
        }
    }
}

/// A fully resolved per-move time budget, as produced by [`TimeManager::allocate`].
///
/// Invariant: `optimal <= soft <= hard <= remaining - reserve` (reserve >= 1s), except under the
/// emergency regime, which explicitly relaxes the reserve to keep a move inside the clock at all.
#[derive(Debug, Copy, Clone)]
pub struct TimeBudget {
    pub optimal: Duration,
    pub soft: Duration,
    pub hard: Duration,
    pub is_emergency: bool,
    pub phase: GamePhase,
    pub complexity_multiplier: f64,
}

/// Reserve this manager never plans to spend into, so a move never leaves the clock at zero even
/// if the search runs right up to its hard bound.
const RESERVE: Duration = Duration::from_secs(1);

const ANTI_WINDUP: f64 = 0.5;
const INTEGRAL_DECAY: f64 = 0.95;
const MULTIPLIER_EMA_ALPHA: f64 = 0.3;
const MULTIPLIER_BOUNDS: (f64, f64) = (0.2, 3.0);

fn position_complexity_multiplier(candidate_count: usize, stones_placed: u32) -> f64 {
    // Many candidates mean many plausible replies worth searching; very few (a forced sequence,
    // or the tail of the game) mean the position resolves itself without extra time.
    let candidate_factor = (candidate_count as f64 / 20.0).clamp(0.5, 1.5);
    let stone_factor = (stones_placed as f64 / 60.0 + 0.8).clamp(0.8, 1.2);
    (candidate_factor * stone_factor).clamp(0.5, 2.0)
}

#[derive(Debug, Clone)]
pub struct TimeManager {
    previous_error: Option<f64>,
    integral: f64,
    adaptive_multiplier: f64,
}

impl Default for TimeManager {
    fn default() -> Self {
        Self { previous_error: None, integral: 0.0, adaptive_multiplier: 1.0 }
    }
}

impl TimeManager {
    /// Computes this move's budget. `remaining_ms`/`initial_s`/`increment_s` describe the clock;
    /// `move_no` and `board`/`side`/`candidate_count` feed the phase and complexity terms.
    pub fn allocate(
        &mut self,
        remaining_ms: u64,
        move_no: u32,
        candidate_count: usize,
        board: &Board,
        _side: Player,
        difficulty: Difficulty,
        initial_s: u64,
        increment_s: u64,
    ) -> TimeBudget {
        let remaining = remaining_ms as f64 / 1000.0;
        let initial = (initial_s.max(1)) as f64;
        let increment = increment_s as f64;

        // Steps 1-4: PID pressure from how much of the clock has burned down.
        let error = (1.0 - remaining / initial).clamp(0.0, 1.0);
        self.integral = (self.integral * INTEGRAL_DECAY + error).clamp(-ANTI_WINDUP, ANTI_WINDUP);
        let derivative = error - self.previous_error.unwrap_or(error);
        self.previous_error = Some(error);
        let pressure = (0.6 * error + 0.3 * self.integral + 0.1 * derivative).clamp(0.0, 1.0);

        // Step 5: adaptive multiplier, EMA-smoothed against the value the last move settled on.
        let target_multiplier = (difficulty.time_aggressiveness() * (1.0 - 0.7 * pressure)).clamp(MULTIPLIER_BOUNDS.0, MULTIPLIER_BOUNDS.1);
        self.adaptive_multiplier =
            (MULTIPLIER_EMA_ALPHA * target_multiplier + (1.0 - MULTIPLIER_EMA_ALPHA) * self.adaptive_multiplier)
                .clamp(MULTIPLIER_BOUNDS.0, MULTIPLIER_BOUNDS.1);

        // Steps 6-7: phase- and complexity-aware base allocation.
        let phase = GamePhase::for_move(move_no);
        let base = remaining / phase.moves_to_end() + 0.6 * increment;
        let complexity_multiplier = position_complexity_multiplier(candidate_count, board.move_count());
        let scaled = base * phase.modifier() * complexity_multiplier * self.adaptive_multiplier;

        // Step 8: caps. Never plan to spend more than this difficulty's share of the remaining
        // clock, nor more than 3x the increment (an anti-burn cap, only meaningful under an
        // increment clock).
        let percent_cap = remaining * difficulty.max_percent_of_remaining();
        let cap = if increment > 0.0 { percent_cap.min(3.0 * increment) } else { percent_cap };
        let mut soft = scaled.clamp(0.01, cap.max(0.01));
        let mut hard = (soft * 1.3).min(cap.max(soft));
        let mut optimal = soft * 0.8;
        let mut is_emergency = false;

        // Step 9: time scramble. The increment is all that is reliably available per move, so
        // cap spend as a fraction of it rather than the dwindling remaining clock.
        if remaining < (3.0 * increment).min(30.0) {
            soft = (increment * 0.4).max(0.3).min(remaining);
            hard = (increment * 0.5).max(0.3).min(remaining);
            optimal = soft * 0.8;
        }

        // Step 10: emergency. The clock is short enough in absolute terms (or there are only a
        // handful of moves left and not enough time to cover them at 1s each) that the reserve
        // itself must be spent into rather than respected.
        let cells_left = board.config().num_cells().saturating_sub(board.move_count() as usize);
        let moves_left = ((cells_left / 2).max(1)) as f64;
        if remaining < (2.0f64).max(initial / 20.0) || (moves_left <= 5.0 && remaining < moves_left * 1.0) {
            is_emergency = true;
            soft = (increment * 0.2).max(0.05).min(remaining);
            hard = (increment * 0.3).max(0.1).min(remaining);
            optimal = soft * 0.8;
        }

        // Final clamp: enforce optimal <= soft <= hard <= remaining - reserve, relaxing the
        // reserve under emergency rather than returning a budget larger than the clock itself.
        let reserve = if is_emergency { 0.0 } else { RESERVE.as_secs_f64() };
        let ceiling = (remaining - reserve).max(0.05);
        hard = hard.min(ceiling);
        soft = soft.min(hard);
        optimal = optimal.min(soft);

        TimeBudget {
            optimal: Duration::from_secs_f64(optimal),
            soft: Duration::from_secs_f64(soft),
            hard: Duration::from_secs_f64(hard),
            is_emergency,
            phase,
            complexity_multiplier,
        }
    }

    /// Feeds back how the move actually went: on a timeout the multiplier is halved (be far more
    /// conservative next move); a move that finished comfortably early nudges it up, one that ran
    /// close to its allocation nudges it down.
    pub fn report_used(&mut self, actual_ms: u64, allocated_ms: u64, timed_out: bool) {
        let actual = actual_ms as f64;
        let allocated = (allocated_ms as f64).max(1.0);
        if timed_out {
            self.adaptive_multiplier *= 0.5;
        } else if actual <= 0.5 * allocated {
            self.adaptive_multiplier *= 1.05;
        } else if actual >= 0.9 * allocated {
            self.adaptive_multiplier *= 0.95;
        }
        self.adaptive_multiplier = self.adaptive_multiplier.clamp(MULTIPLIER_BOUNDS.0, MULTIPLIER_BOUNDS.1);
    }

    /// Clears all per-game state; called at the start of a new game.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board::BoardConfig;

    fn board_at(move_no: u32) -> Board {
        let cfg = BoardConfig::default();
        let mut board = Board::empty(cfg);
        let mut player = Player::Red;
        let mut x = 0u8;
        for _ in 0..move_no {
            board = board.place(board::Pos::new(x % cfg.width, x / cfg.width), player).unwrap();
            player = player.opposite();
            x += 1;
        }
        board
    }

    #[test]
    fn soft_never_exceeds_hard_and_hard_never_exceeds_the_clock() {
        let mut tm = TimeManager::default();
        let board = board_at(4);
        let budget = tm.allocate(100_000, 4, 8, &board, Player::Red, Difficulty::Medium, 100, 1);
        assert!(budget.optimal <= budget.soft);
        assert!(budget.soft <= budget.hard);
        assert!(budget.hard.as_secs_f64() <= 100.0);
    }

    #[test]
    fn short_clock_triggers_emergency_mode() {
        let mut tm = TimeManager::default();
        let board = board_at(4);
        let budget = tm.allocate(1_500, 4, 8, &board, Player::Red, Difficulty::Medium, 100, 0);
        assert!(budget.is_emergency);
        assert!(budget.hard.as_secs_f64() <= 1.5);
    }

    #[test]
    fn timeout_sharply_reduces_the_next_allocation() {
        let mut tm = TimeManager::default();
        let board = board_at(4);
        let baseline = tm.allocate(100_000, 4, 8, &board, Player::Red, Difficulty::Medium, 100, 1).soft;
        tm.report_used(9_000, 3_000, true);
        let after_timeout = tm.allocate(97_000, 5, 8, &board, Player::Red, Difficulty::Medium, 100, 1).soft;
        assert!(after_timeout < baseline);
    }

    #[test]
    fn reset_clears_accumulated_state() {
        let mut tm = TimeManager::default();
        let board = board_at(4);
        tm.allocate(10_000, 4, 8, &board, Player::Red, Difficulty::Medium, 100, 1);
        tm.report_used(9_000, 1_000, true);
        tm.reset();
        let fresh = TimeManager::default();
        assert_eq!(tm.adaptive_multiplier, fresh.adaptive_multiplier);
        assert_eq!(tm.integral, fresh.integral);
    }
}
