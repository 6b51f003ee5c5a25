//! Pondering: keep searching the position the engine expects next while the opponent thinks.
//!
//! A small explicit state machine rather than a handful of booleans, since the legal transitions
//! are few and the illegal ones (e.g. starting a ponder search while already pondering) are easy
//! to get wrong with ad hoc flags. All state access goes through `&mut self`; callers that share a
//! `Ponderer` across threads are expected to guard it with their own mutex, the same way a single
//! `TranspositionTable` handle is shared explicitly rather than made internally synchronized.

use crate::config::Difficulty;
use crate::search::{search, SearchLimits, SearchResult, SearchShared};
use crate::tt::TranspositionTable;
use board::{Board, Player, Pos};
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long `handle_opponent_move` waits for the worker to finish on its own before giving up and
/// reporting whatever it last produced; used on a ponder hit, where the search is still useful and
/// worth a short grace period.
const HANDOFF_WAIT: Duration = Duration::from_millis(50);
/// How long a stopped worker is given to notice the stop flag and return, on a miss or an explicit
/// `stop()`.
const STOP_WAIT: Duration = Duration::from_millis(500);

/// Final report for one ponder episode: what the background search had found by the time
/// pondering resolved, whether by hit, miss, or explicit cancellation.
#[derive(Debug, Clone, Default)]
pub struct PonderResult {
    pub best_move: Option<Pos>,
    pub depth: u8,
    pub score: i32,
    pub nodes: u64,
    pub time_spent: Duration,
    pub ponder_hit: bool,
}

impl PonderResult {
    fn from_search(result: SearchResult, time_spent: Duration, ponder_hit: bool) -> Self {
        Self { best_move: result.best_move, depth: result.depth, score: result.score, nodes: result.nodes, time_spent, ponder_hit }
    }

    /// Adjusts a ponder-hit result to reflect that the search already assumed the opponent's move:
    /// it started one ply deeper than a fresh search would, so its reported depth is bumped to
    /// match what a caller comparing against a from-scratch search would expect.
    pub fn merged_for_hit(self) -> Self {
        Self { depth: self.depth.saturating_add(1), ..self }
    }
}

/// Hits, misses and cumulative time spent pondering over the lifetime of one `Ponderer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PonderStatistics {
    pub hits: u32,
    pub misses: u32,
    pub total_ponder_time: Duration,
}

/// Everything alive while `Pondering`: the board the worker is searching, the move it assumes the
/// opponent played, and the handle needed to resolve or cancel it.
struct PonderContext {
    predicted_move: Option<Pos>,
    started_at: Instant,
    shared: Arc<SearchShared>,
    handle: JoinHandle<SearchResult>,
}

impl std::fmt::Debug for PonderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PonderContext")
            .field("predicted_move", &self.predicted_move)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// The five documented ponder states. Terminal states (`PonderHit`, `PonderMiss`, `Cancelled`) only
/// return to `Idle` through an explicit [`Ponderer::reset`]; nothing transitions straight back to
/// `Pondering` without going through `Idle` first.
#[derive(Debug)]
pub enum PonderState {
    Idle,
    Pondering(PonderContext),
    PonderHit(PonderResult),
    PonderMiss(PonderResult),
    Cancelled(PonderResult),
}

impl Default for PonderState {
    fn default() -> Self {
        PonderState::Idle
    }
}

/// Waits up to `timeout` for `handle` to finish, polling rather than blocking so the caller's own
/// bound is honoured even if the worker never notices the stop flag.
fn wait_for_finish(handle: &JoinHandle<SearchResult>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[derive(Debug, Default)]
pub struct Ponderer {
    state: PonderState,
    statistics: PonderStatistics,
}

impl Ponderer {
    pub fn state(&self) -> &PonderState {
        &self.state
    }

    pub fn is_pondering(&self) -> bool {
        matches!(self.state, PonderState::Pondering(_))
    }

    pub fn statistics(&self) -> PonderStatistics {
        self.statistics
    }

    /// Starts pondering `predicted_move` for `opponent_to_move` on top of `board`, then searches
    /// the resulting position for `side_pondering_for`. Ignored (not an error) unless currently
    /// `Idle`. Below `Difficulty::Easy` pondering is skipped outright: a search that shallow
    /// finishes near-instantly, so there is nothing useful left to do with the opponent's clock.
    pub fn start(
        &mut self,
        board: Board,
        opponent_to_move: Player,
        predicted_move: Option<Pos>,
        side_pondering_for: Player,
        tt: TranspositionTable,
        difficulty: Difficulty,
        max_ms: u64,
    ) {
        if !matches!(self.state, PonderState::Idle) {
            log::debug!("ignoring ponder start request: ponderer is not idle");
            return;
        }
        if difficulty <= Difficulty::Easy {
            log::debug!("skipping ponder at {difficulty:?}: position is quiet enough not to bother");
            return;
        }

        let pondered_board = match predicted_move {
            Some(m) => board.place(m, opponent_to_move).unwrap_or(board),
            None => board,
        };
        let limits = SearchLimits {
            max_depth: difficulty.max_depth(),
            deadline: Some(Instant::now() + Duration::from_millis(max_ms)),
            ..SearchLimits::default()
        };
        let shared = Arc::new(SearchShared::default());
        let worker_shared = Arc::clone(&shared);
        let started_at = Instant::now();
        let handle = std::thread::spawn(move || search(&pondered_board, side_pondering_for, &tt, &worker_shared, limits));

        log::debug!("pondering, predicting {opponent_to_move} plays {predicted_move:?}");
        self.state = PonderState::Pondering(PonderContext { predicted_move, started_at, shared, handle });
    }

    /// Resolves the opponent's actual move against the predicted one. On a hit, waits briefly for
    /// the worker to finish on its own; on a miss, signals it to stop and waits bounded for it to
    /// unwind. Returns `None` if no ponder was in flight.
    pub fn handle_opponent_move(&mut self, actual_move: Pos) -> Option<PonderResult> {
        let ctx = match std::mem::take(&mut self.state) {
            PonderState::Pondering(ctx) => ctx,
            other => {
                self.state = other;
                return None;
            }
        };

        let hit = ctx.predicted_move == Some(actual_move);
        if hit {
            log::debug!("ponder hit: opponent played the predicted {actual_move}");
            wait_for_finish(&ctx.handle, HANDOFF_WAIT);
        } else {
            log::debug!("ponder miss: opponent played {actual_move} instead of the predicted reply");
            ctx.shared.stop.store(true, Relaxed);
            wait_for_finish(&ctx.handle, STOP_WAIT);
        }

        let elapsed = ctx.started_at.elapsed();
        let search_result =
            if ctx.handle.is_finished() { ctx.handle.join().unwrap_or_default() } else { SearchResult::default() };
        let result = PonderResult::from_search(search_result, elapsed, hit);

        self.statistics.total_ponder_time += elapsed;
        if hit {
            self.statistics.hits += 1;
            self.state = PonderState::PonderHit(result.clone());
        } else {
            self.statistics.misses += 1;
            self.state = PonderState::PonderMiss(result.clone());
        }
        Some(result)
    }

    /// Cancels an in-flight ponder search, waiting bounded for the worker to unwind and recording
    /// the best result it had found. A no-op outside `Pondering`.
    pub fn stop(&mut self) {
        let ctx = match std::mem::take(&mut self.state) {
            PonderState::Pondering(ctx) => ctx,
            other => {
                self.state = other;
                return;
            }
        };
        ctx.shared.stop.store(true, Relaxed);
        wait_for_finish(&ctx.handle, STOP_WAIT);
        let elapsed = ctx.started_at.elapsed();
        let search_result =
            if ctx.handle.is_finished() { ctx.handle.join().unwrap_or_default() } else { SearchResult::default() };
        self.statistics.total_ponder_time += elapsed;
        self.state = PonderState::Cancelled(PonderResult::from_search(search_result, elapsed, false));
    }

    /// Returns a terminal state to `Idle`, ready for the next `start`. A no-op from `Idle` or from
    /// `Pondering`: resetting a live worker without stopping it first would leak it, so a caller
    /// must `stop()` before `reset()` resolves anything.
    pub fn reset(&mut self) {
        match &self.state {
            PonderState::PonderHit(_) | PonderState::PonderMiss(_) | PonderState::Cancelled(_) => {
                self.state = PonderState::Idle;
            }
            PonderState::Idle => {}
            PonderState::Pondering(_) => {
                log::debug!("ignoring reset(): still pondering, call stop() first");
            }
        }
    }
}
