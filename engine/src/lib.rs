//! Search engine built on top of the `board` crate: transposition table, move ordering, the main
//! alpha-beta search, a VCF solver, a Lazy-SMP worker pool, a ponder state machine and an adaptive
//! time manager.

pub mod config;
pub mod error;
pub mod movegen;
pub mod parallel;
pub mod ponder;
pub mod search;
pub mod time_manager;
pub mod tt;
pub mod vcf;

pub use config::{Difficulty, EngineConfig};
pub use error::EngineError;
pub use parallel::{search_parallel, ParallelLimits};
pub use ponder::{PonderResult, PonderState, PonderStatistics, Ponderer};
pub use search::{search, SearchLimits, SearchResult, SearchShared};
pub use time_manager::{GamePhase, TimeBudget, TimeManager};
pub use tt::TranspositionTable;
pub use vcf::{solve as solve_vcf, VcfLimits, VcfResult};

use board::{Board, Player};
use std::time::Instant;

/// Finds the best move for `side_to_move` in `board` under `config`, using the VCF solver first
/// and falling back to the full alpha-beta search when no forced win is found.
///
/// `side_to_move` is taken explicitly rather than derived from `board`'s move count, since callers
/// may construct a position (e.g. a puzzle or a test fixture) that isn't reachable by strictly
/// alternating play from an empty board.
///
/// When `config.vcf_pre_check_enabled` is set, a found forced win short-circuits everything else:
/// no parallel search is started and the reported score is `MATE` minus the number of plies in the
/// solver's line, mirroring how a mate score from the main search encodes distance to mate.
///
/// This is the single public entry point most callers need; [`search_parallel`] and [`solve_vcf`]
/// are exposed separately for callers that want to drive the pieces themselves (e.g. a ponderer
/// that wants to keep a worker pool alive across moves).
pub fn find_best_move(board: &Board, side_to_move: Player, tt: &TranspositionTable, config: &EngineConfig) -> SearchResult {
    if config.vcf_pre_check_enabled {
        if let Some(forced_win) = solve_vcf(board, side_to_move, config.vcf) {
            let best_move = forced_win.line[0];
            let proof_ply = forced_win.line.len() as i32;
            return SearchResult {
                best_move: Some(best_move),
                score: board::MATE - proof_ply,
                depth: 0,
                nodes: 0,
                pv: forced_win.line,
            };
        }
    }
    search_parallel(board, side_to_move, tt, config.parallel_limits())
}

/// The game clock, as handed to [`find_best_move_timed`].
#[derive(Debug, Copy, Clone)]
pub struct ClockState {
    pub remaining_ms: u64,
    pub initial_s: u64,
    pub increment_s: u64,
}

/// Like [`find_best_move`], but first asks `time_manager` for this move's budget given `clock`
/// and the position's candidate count, uses the budget's hard bound as the search's deadline, and
/// reports the actual spend back to `time_manager` afterwards so the next call's allocation
/// reflects how this move went. This is the control flow a game-playing caller actually wants;
/// [`find_best_move`] stays available for callers (puzzles, benchmarks) with no clock at all.
pub fn find_best_move_timed(
    board: &Board,
    side_to_move: Player,
    tt: &TranspositionTable,
    config: &EngineConfig,
    time_manager: &mut TimeManager,
    clock: ClockState,
) -> SearchResult {
    let candidate_count = movegen::candidate_moves(board).len();
    let budget = time_manager.allocate(
        clock.remaining_ms,
        board.move_count(),
        candidate_count,
        board,
        side_to_move,
        config.difficulty,
        clock.initial_s,
        clock.increment_s,
    );
    log::debug!("time budget for move {}: {budget:?}", board.move_count());
    let timed_config =
        EngineConfig { search: SearchLimits { deadline: Some(Instant::now() + budget.hard), ..config.search }, ..config.clone() };

    let started = Instant::now();
    let result = find_best_move(board, side_to_move, tt, &timed_config);
    let elapsed = started.elapsed();
    let timed_out = elapsed >= budget.hard;
    time_manager.report_used(elapsed.as_millis() as u64, budget.hard.as_millis().max(1) as u64, timed_out);
    result
}
