//! Lazy-SMP: several worker threads search the same position through the same shared
//! transposition table, each with independently randomized move-ordering jitter so they explore
//! different parts of the tree and reinforce each other through TT hits.

use crate::search::{search, SearchLimits, SearchResult, SearchShared};
use crate::tt::TranspositionTable;
use board::{Board, Player};
use rand::Rng;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use threadpool::ThreadPool;

/// How long `search_parallel` waits for stragglers after every worker has been told to stop.
/// A worker normally notices `SearchShared::stop` within a few nodes; this bound exists only to
/// keep a wedged or pathologically slow worker from hanging the caller forever.
const JOIN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Copy, Clone)]
pub struct ParallelLimits {
    pub search: SearchLimits,
    pub num_threads: usize,
}

impl Default for ParallelLimits {
    fn default() -> Self {
        Self { search: SearchLimits::default(), num_threads: 1 }
    }
}

/// Best-root voting: a deeper completed iteration always wins; at equal depth the higher score
/// wins (mirroring how a single-threaded searcher would have kept searching).
fn is_better(candidate: &SearchResult, current: &SearchResult) -> bool {
    candidate.depth > current.depth || (candidate.depth == current.depth && candidate.score > current.score)
}

/// Runs `limits.num_threads` Lazy-SMP workers against `board` and returns the best-voted result.
/// All workers share `tt`; the caller owns `tt`'s lifetime and may reuse it across searches.
pub fn search_parallel(board: &Board, side_to_move: Player, tt: &TranspositionTable, limits: ParallelLimits) -> SearchResult {
    let num_threads = limits.num_threads.max(1);
    let shared = Arc::new(SearchShared::default());
    let best: Arc<Mutex<Option<SearchResult>>> = Arc::new(Mutex::new(None));

    if num_threads == 1 {
        return search(board, side_to_move, tt, &shared, limits.search);
    }

    let pool = ThreadPool::new(num_threads);
    for worker_id in 0..num_threads {
        let board = *board;
        let tt = tt.clone();
        let shared = Arc::clone(&shared);
        let best = Arc::clone(&best);
        let mut worker_limits = limits.search;
        // helper threads get a randomly jittered depth budget so they diverge from the main
        // thread's line early and reinforce each other through TT hits rather than all exploring
        // the exact same principal variation.
        if worker_id > 0 {
            let jitter = rand::thread_rng().gen_range(0..=2u8);
            worker_limits.max_depth = worker_limits.max_depth.saturating_add(jitter);
        }
        pool.execute(move || {
            let result = search(&board, side_to_move, &tt, &shared, worker_limits);
            let mut guard = best.lock().expect("search result mutex poisoned");
            let replace = match guard.as_ref() {
                Some(current) => is_better(&result, current),
                None => true,
            };
            if replace {
                *guard = Some(result);
            }
        });
    }

    // `pool.join()` blocks until every worker returns; a worker that misses the stop signal (or
    // is stuck in a pathologically slow leaf) must not be allowed to hang the caller forever, so
    // the join happens on a side thread and we only wait on it for `JOIN_TIMEOUT`.
    let (done_tx, done_rx) = mpsc::channel();
    std::thread::spawn(move || {
        pool.join();
        let _ = done_tx.send(());
    });
    if done_rx.recv_timeout(JOIN_TIMEOUT).is_err() {
        log::warn!("lazy-smp workers did not join within {JOIN_TIMEOUT:?}; forcing stop and abandoning stragglers");
        shared.stop.store(true, Relaxed);
    }
    best.lock().expect("search result mutex poisoned").take().expect("at least one worker always runs")
}

/// Signals every running worker sharing `shared` to stop as soon as it next checks, and bumps
/// `tt`'s generation so a subsequent search does not treat the cancelled workers' entries as
/// fresher than they are.
pub fn stop(shared: &SearchShared, tt: &mut TranspositionTable) {
    shared.stop.store(true, Relaxed);
    tt.clear();
}
