//! End-to-end scenarios against the public API: each test sets up a concrete position and checks
//! the move (or score, or state transition) the engine is expected to produce.

use board::{Board, BoardConfig, Player, Pos, MATE};
use engine::{search, Difficulty, EngineConfig, Ponderer, SearchShared, TranspositionTable};
use std::thread;
use std::time::{Duration, Instant};

fn place_all(cfg: BoardConfig, stones: &[(u8, u8, Player)]) -> Board {
    let mut board = Board::empty(cfg);
    for &(x, y, player) in stones {
        board = board.place(Pos::new(x, y), player).expect("test fixture places on empty cells");
    }
    board
}

#[test]
fn immediate_five_is_found_and_scored_as_a_near_mate() {
    let cfg = BoardConfig::default();
    let board = place_all(cfg, &[(7, 7, Player::Red), (8, 7, Player::Red), (9, 7, Player::Red), (10, 7, Player::Red)]);
    let tt = TranspositionTable::with_size_mib(1);
    let shared = SearchShared::default();
    let result = search(&board, Player::Red, &tt, &shared, EngineConfig::for_difficulty(Difficulty::Medium).search);

    let best = result.best_move.expect("an open four must produce a move");
    assert!(best == Pos::new(6, 7) || best == Pos::new(11, 7), "expected an end of the four, got {best}");
    assert!(result.score >= MATE - 2, "expected a near-mate score, got {}", result.score);
}

#[test]
fn semi_open_four_must_be_blocked_on_its_open_end() {
    let cfg = BoardConfig::default();
    let board = place_all(
        cfg,
        &[
            (7, 7, Player::Red),
            (8, 7, Player::Red),
            (9, 7, Player::Red),
            (10, 7, Player::Red),
            (6, 7, Player::Blue),
        ],
    );
    assert_eq!(board.side_to_move(), Player::Blue, "five placements, odd count, Blue to move next");

    let tt = TranspositionTable::with_size_mib(1);
    let shared = SearchShared::default();
    let result = search(&board, Player::Blue, &tt, &shared, EngineConfig::for_difficulty(Difficulty::Hard).search);

    assert_eq!(result.best_move, Some(Pos::new(11, 7)));
}

#[test]
fn caro_overline_is_not_reported_as_a_mate_score() {
    let cfg = BoardConfig::default();
    // Five in a row before the extending move; still Red's turn.
    let before = place_all(
        cfg,
        &[(5, 7, Player::Red), (6, 7, Player::Red), (7, 7, Player::Red), (8, 7, Player::Red), (9, 7, Player::Red)],
    );
    let after_six = before.place(Pos::new(10, 7), Player::Red).unwrap();

    let eval = board::evaluate(&after_six, Player::Blue);
    assert!(eval.abs() < MATE - 100, "an overline must not be scored as a win, got {eval}");

    let tt = TranspositionTable::with_size_mib(1);
    let shared = SearchShared::default();
    let result = search(&before, Player::Red, &tt, &shared, EngineConfig::for_difficulty(Difficulty::Easy).search);
    assert!(result.score.abs() < MATE - 100, "search must not treat the overline extension as a forced win");
}

#[test]
fn a_four_blocked_on_one_end_still_needs_the_other_end_blocked() {
    let cfg = BoardConfig::default();
    let board = place_all(
        cfg,
        &[
            (3, 4, Player::Blue),
            (4, 4, Player::Blue),
            (5, 4, Player::Blue),
            (6, 4, Player::Blue),
            (7, 4, Player::Red),
        ],
    );

    let tt = TranspositionTable::with_size_mib(1);
    let shared = SearchShared::default();
    let result = search(&board, Player::Red, &tt, &shared, EngineConfig::for_difficulty(Difficulty::Medium).search);

    assert_eq!(result.best_move, Some(Pos::new(2, 4)));
}

#[test]
fn ponder_hit_keeps_the_in_flight_search_and_reports_a_deeper_iteration() {
    let cfg = BoardConfig::default();
    let board = place_all(cfg, &[(7, 7, Player::Red)]);
    let predicted_reply = Pos::new(7, 8);

    let mut ponderer = Ponderer::default();
    let tt = TranspositionTable::with_size_mib(1);
    let started = Instant::now();
    ponderer.start(board, Player::Blue, Some(predicted_reply), Player::Red, tt, Difficulty::Medium, 2_000);
    assert!(ponderer.is_pondering());

    thread::sleep(Duration::from_millis(50));
    let result = ponderer.handle_opponent_move(predicted_reply).expect("a ponder was in flight");
    assert!(result.ponder_hit, "the opponent played the predicted reply");

    let merged = result.merged_for_hit();
    assert!(merged.best_move.is_some());
    assert!(merged.depth >= 1);
    assert!(started.elapsed() < Duration::from_secs(5), "ponder hit resolution should be fast in this fixture");
    assert_eq!(ponderer.statistics().hits, 1);
}

#[test]
fn ponder_miss_stops_the_worker_and_returns_to_idle_on_reset() {
    let cfg = BoardConfig::default();
    let board = place_all(cfg, &[(7, 7, Player::Red)]);
    let predicted_reply = Pos::new(7, 8);
    let actual_reply = Pos::new(9, 9);

    let mut ponderer = Ponderer::default();
    let tt = TranspositionTable::with_size_mib(1);
    ponderer.start(board, Player::Blue, Some(predicted_reply), Player::Red, tt, Difficulty::Medium, 2_000);

    let result = ponderer.handle_opponent_move(actual_reply).expect("a ponder was in flight");
    assert!(!result.ponder_hit, "the opponent deviated from the predicted reply");
    assert!(matches!(ponderer.state(), engine::PonderState::PonderMiss(_)));
    assert_eq!(ponderer.statistics().misses, 1);

    ponderer.reset();
    assert!(matches!(ponderer.state(), engine::PonderState::Idle));
}
