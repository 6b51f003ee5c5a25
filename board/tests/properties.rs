//! Property-based tests over the invariants the core data types are expected to uphold under
//! arbitrary (in-bounds) inputs, rather than single hand-picked examples.

use board::{evaluate, Board, BoardConfig, Player, Pos, ThreatKind};
use proptest::prelude::*;

fn cfg() -> BoardConfig {
    BoardConfig::default()
}

fn pos_strategy(cfg: BoardConfig) -> impl Strategy<Value = Pos> {
    (0..cfg.width, 0..cfg.height).prop_map(|(x, y)| Pos::new(x, y))
}

proptest! {
    /// `place` never mutates the receiver: every other cell keeps its prior occupant, and the
    /// move count only changes on the returned board.
    #[test]
    fn place_leaves_the_original_board_untouched(target in pos_strategy(cfg()), other in pos_strategy(cfg())) {
        prop_assume!(target != other);
        let cfg = cfg();
        let board = Board::empty(cfg);
        let before_other = board.cell(other);
        let before_count = board.move_count();

        let after = board.place(target, Player::Red).unwrap();

        prop_assert_eq!(board.cell(other), before_other);
        prop_assert_eq!(board.move_count(), before_count);
        prop_assert_eq!(after.cell(target), Player::Red);
    }

    /// After any sequence of alternating placements, the two player bitboards stay disjoint and
    /// their combined population matches the move count exactly.
    #[test]
    fn bitboards_stay_disjoint_and_match_move_count(
        coords in prop::collection::vec(pos_strategy(cfg()), 1..40)
    ) {
        let cfg = cfg();
        let mut board = Board::empty(cfg);
        let mut seen = std::collections::HashSet::new();
        let mut player = Player::Red;
        for pos in coords {
            if !seen.insert(pos) {
                continue; // skip duplicate cells, place() would just reject the second one anyway
            }
            board = board.place(pos, player).unwrap();
            player = player.opposite();
        }
        prop_assert!((board.bitboard(Player::Red) & board.bitboard(Player::Blue)).is_zero());
        let total = board.bitboard(Player::Red).count_ones() + board.bitboard(Player::Blue).count_ones();
        prop_assert_eq!(total, board.move_count());
    }

    /// The Zobrist hash of a position depends only on the final set of occupied cells per player,
    /// not on the order stones were placed in.
    #[test]
    fn hash_is_independent_of_placement_order(
        seed in prop::collection::vec(pos_strategy(cfg()), 1..12)
    ) {
        let cfg = cfg();
        let mut distinct: Vec<Pos> = Vec::new();
        for pos in seed {
            if !distinct.contains(&pos) {
                distinct.push(pos);
            }
        }
        prop_assume!(!distinct.is_empty());

        let mut forward = Board::empty(cfg);
        let mut player = Player::Red;
        for &pos in &distinct {
            forward = forward.place(pos, player).unwrap();
            player = player.opposite();
        }

        let mut reversed = Board::empty(cfg);
        let mut player = Player::Red;
        for &pos in distinct.iter().rev() {
            reversed = reversed.place(pos, player).unwrap();
            player = player.opposite();
        }

        prop_assert_eq!(forward.hash(), reversed.hash());
    }

    /// A five is a win exactly when it is not part of a same-color overline and not blocked by the
    /// opponent on both ends; the board edge never counts as an opponent block.
    #[test]
    fn five_win_rule_holds_across_blocking_configurations(
        start_col in 0u8..9,
        left_blocked in any::<bool>(),
        right_blocked in any::<bool>(),
    ) {
        let cfg = cfg();
        let mut board = Board::empty(cfg);
        for i in 0..5u8 {
            board = board.place(Pos::new(start_col + i, 7), Player::Red).unwrap();
        }
        if left_blocked && start_col > 0 {
            board = board.place(Pos::new(start_col - 1, 7), Player::Blue).unwrap();
        }
        if right_blocked && start_col + 5 < cfg.width {
            board = board.place(Pos::new(start_col + 5, 7), Player::Blue).unwrap();
        }

        let actually_blocked_left = left_blocked && start_col > 0;
        let actually_blocked_right = right_blocked && start_col + 5 < cfg.width;

        let threats = board::detect_threats(&board, Player::Red);
        let is_five = threats.iter().any(|t| t.kind == ThreatKind::Five);
        prop_assert_eq!(is_five, !(actually_blocked_left && actually_blocked_right));
    }

    /// Evaluating the same board from the two players' perspectives always yields negatives of
    /// each other, for any reachable position (not just the empty board).
    #[test]
    fn evaluation_is_antisymmetric_for_arbitrary_positions(
        coords in prop::collection::vec(pos_strategy(cfg()), 0..20)
    ) {
        let cfg = cfg();
        let mut board = Board::empty(cfg);
        let mut player = Player::Red;
        let mut seen = std::collections::HashSet::new();
        for pos in coords {
            if !seen.insert(pos) {
                continue;
            }
            board = board.place(pos, player).unwrap();
            player = player.opposite();
        }
        prop_assert_eq!(evaluate(&board, Player::Red), -evaluate(&board, Player::Blue));
    }
}
