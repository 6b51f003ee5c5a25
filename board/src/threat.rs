//! Pure threat classification: enumerates line patterns around a player's stones.
//!
//! Has no search-tree knowledge and only reads the board.

use crate::board::Board;
use crate::geometry::{BoardConfig, Player, Pos};
use std::cmp::Ordering;

/// Ordered so that `Ord`/`PartialOrd` give the priority order
/// `Five > StraightFour > BrokenFour > StraightThree > BrokenThree`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum ThreatKind {
    BrokenThree,
    StraightThree,
    BrokenFour,
    StraightFour,
    Five,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Direction {
    Horizontal,
    Vertical,
    Diagonal,
    AntiDiagonal,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Threat {
    pub kind: ThreatKind,
    pub direction: Direction,
    /// The stones that make up this pattern.
    pub stones: Vec<Pos>,
    /// Empty cells whose occupation converts this threat into a stronger one. Empty for a `Five`
    /// (already won, nothing to gain).
    pub gain_squares: Vec<Pos>,
}

fn in_bounds_i32(cfg: BoardConfig, x: i32, y: i32) -> bool {
    x >= 0 && y >= 0 && x < cfg.width as i32 && y < cfg.height as i32
}

/// All maximal lines in the board for a given step vector, one per distinct line.
fn lines_for_step(cfg: BoardConfig, step: (i32, i32)) -> Vec<Vec<Pos>> {
    let mut lines = Vec::new();
    for y in 0..cfg.height as i32 {
        for x in 0..cfg.width as i32 {
            let prev = (x - step.0, y - step.1);
            if in_bounds_i32(cfg, prev.0, prev.1) {
                continue; // not the head of a line
            }
            let mut line = Vec::new();
            let (mut cx, mut cy) = (x, y);
            while in_bounds_i32(cfg, cx, cy) {
                line.push(Pos::new(cx as u8, cy as u8));
                cx += step.0;
                cy += step.1;
            }
            lines.push(line);
        }
    }
    lines
}

const DIRECTIONS: [(Direction, (i32, i32)); 4] = [
    (Direction::Horizontal, (1, 0)),
    (Direction::Vertical, (0, 1)),
    (Direction::Diagonal, (1, 1)),
    (Direction::AntiDiagonal, (1, -1)),
];

/// Enumerates every threat of `player` on `board`, ordered strongest-first.
pub fn detect_threats(board: &Board, player: Player) -> Vec<Threat> {
    debug_assert!(player.is_some());
    let cfg = board.config();
    let win_len = cfg.win_len as usize;
    let opponent = player.opposite();
    let mut out = Vec::new();

    for &(direction, step) in &DIRECTIONS {
        for line in lines_for_step(cfg, step) {
            let cells: Vec<Player> = line.iter().map(|&p| board.cell(p)).collect();
            scan_runs(&line, &cells, player, opponent, win_len, direction, &mut out);
            scan_broken(&line, &cells, player, opponent, win_len, direction, &mut out);
        }
    }

    out.sort_by(|a, b| b.kind.cmp(&a.kind).then_with(|| fallback_order(a, b)));
    out
}

fn fallback_order(a: &Threat, b: &Threat) -> Ordering {
    a.stones.first().cmp(&b.stones.first())
}

/// Maximal contiguous runs of `player` stones: exact-length-5 runs become `Five`, length-4 runs
/// with an open flank become `StraightFour`, length-3 runs open on both flanks become
/// `StraightThree`.
fn scan_runs(
    line: &[Pos],
    cells: &[Player],
    player: Player,
    opponent: Player,
    win_len: usize,
    direction: Direction,
    out: &mut Vec<Threat>,
) {
    let n = cells.len();
    let mut i = 0;
    while i < n {
        if cells[i] != player {
            i += 1;
            continue;
        }
        let start = i;
        while i < n && cells[i] == player {
            i += 1;
        }
        let end = i; // exclusive
        let run_len = end - start;
        let left_empty = start > 0 && cells[start - 1] == Player::None;
        let right_empty = end < n && cells[end] == Player::None;
        let left_blocked = start > 0 && cells[start - 1] == opponent;
        let right_blocked = end < n && cells[end] == opponent;

        if run_len == win_len {
            // Exactly five, never six-or-more (overlines are excluded by construction: a run of
            // six would have run_len == win_len + 1 and fall through to the `else` branch below).
            if !(left_blocked && right_blocked) {
                out.push(Threat {
                    kind: ThreatKind::Five,
                    direction,
                    stones: line[start..end].to_vec(),
                    gain_squares: Vec::new(),
                });
            }
        } else if run_len == win_len - 1 {
            let mut gains = Vec::new();
            if left_empty {
                gains.push(line[start - 1]);
            }
            if right_empty {
                gains.push(line[end]);
            }
            if !gains.is_empty() {
                out.push(Threat { kind: ThreatKind::StraightFour, direction, stones: line[start..end].to_vec(), gain_squares: gains });
            }
        } else if run_len == win_len - 2 && left_empty && right_empty {
            out.push(Threat {
                kind: ThreatKind::StraightThree,
                direction,
                stones: line[start..end].to_vec(),
                gain_squares: vec![line[start - 1], line[end]],
            });
        }
        // run_len >= win_len + 1 (overline) or weaker runs: no threat emitted.
    }
}

/// Broken patterns: a single internal gap inside an otherwise-full window.
/// `BrokenFour`: 4 stones + 1 interior gap within a `win_len`-cell window.
/// `BrokenThree`: 3 stones + 1 interior gap within a `(win_len - 1)`-cell window.
fn scan_broken(
    line: &[Pos],
    cells: &[Player],
    player: Player,
    opponent: Player,
    win_len: usize,
    direction: Direction,
    out: &mut Vec<Threat>,
) {
    scan_broken_window(line, cells, player, opponent, win_len, win_len - 1, ThreatKind::BrokenFour, direction, out);
    if win_len >= 2 {
        scan_broken_window(line, cells, player, opponent, win_len - 1, win_len - 2, ThreatKind::BrokenThree, direction, out);
    }
}

#[allow(clippy::too_many_arguments)]
fn scan_broken_window(
    line: &[Pos],
    cells: &[Player],
    player: Player,
    opponent: Player,
    window_len: usize,
    needed_stones: usize,
    kind: ThreatKind,
    direction: Direction,
    out: &mut Vec<Threat>,
) {
    let n = cells.len();
    if n < window_len {
        return;
    }
    for start in 0..=(n - window_len) {
        let window = &cells[start..start + window_len];
        if window.iter().any(|&c| c == opponent) {
            continue;
        }
        let own = window.iter().filter(|&&c| c == player).count();
        let empties: Vec<usize> =
            window.iter().enumerate().filter(|&(_, &c)| c == Player::None).map(|(i, _)| i).collect();
        if own != needed_stones || empties.len() != 1 {
            continue;
        }
        let gap = empties[0];
        if gap == 0 || gap == window_len - 1 {
            continue; // an edge gap is a contiguous run, already reported by `scan_runs`
        }
        let stones: Vec<Pos> = (0..window_len).filter(|&i| i != gap).map(|i| line[start + i]).collect();
        out.push(Threat { kind, direction, stones, gain_squares: vec![line[start + gap]] });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    fn board_with(cfg: BoardConfig, stones: &[(u8, u8, Player)]) -> Board {
        let mut b = Board::empty(cfg);
        for &(x, y, p) in stones {
            b = b.place(Pos::new(x, y), p).unwrap();
        }
        b
    }

    #[test]
    fn detects_straight_five() {
        let cfg = BoardConfig::default();
        let b = board_with(
            cfg,
            &[(7, 7, Player::Red), (8, 7, Player::Red), (9, 7, Player::Red), (10, 7, Player::Red), (11, 7, Player::Red)],
        );
        let threats = detect_threats(&b, Player::Red);
        assert_eq!(threats[0].kind, ThreatKind::Five);
    }

    #[test]
    fn overline_is_not_a_five() {
        let cfg = BoardConfig::default();
        let b = board_with(
            cfg,
            &[
                (5, 7, Player::Red),
                (6, 7, Player::Red),
                (7, 7, Player::Red),
                (8, 7, Player::Red),
                (9, 7, Player::Red),
                (10, 7, Player::Red),
            ],
        );
        let threats = detect_threats(&b, Player::Red);
        assert!(threats.iter().all(|t| t.kind != ThreatKind::Five), "six in a row must not count as a five");
    }

    #[test]
    fn five_blocked_on_both_ends_is_not_a_win() {
        let cfg = BoardConfig::default();
        let b = board_with(
            cfg,
            &[
                (3, 7, Player::Blue),
                (4, 7, Player::Red),
                (5, 7, Player::Red),
                (6, 7, Player::Red),
                (7, 7, Player::Red),
                (8, 7, Player::Red),
                (9, 7, Player::Blue),
            ],
        );
        let threats = detect_threats(&b, Player::Red);
        assert!(threats.iter().all(|t| t.kind != ThreatKind::Five));
    }

    #[test]
    fn five_blocked_on_one_end_is_still_a_win() {
        let cfg = BoardConfig::default();
        let b = board_with(
            cfg,
            &[(3, 7, Player::Blue), (4, 7, Player::Red), (5, 7, Player::Red), (6, 7, Player::Red), (7, 7, Player::Red), (8, 7, Player::Red)],
        );
        let threats = detect_threats(&b, Player::Red);
        assert!(threats.iter().any(|t| t.kind == ThreatKind::Five));
    }

    #[test]
    fn open_three_has_two_gain_squares() {
        let cfg = BoardConfig::default();
        let b = board_with(cfg, &[(6, 7, Player::Red), (7, 7, Player::Red), (8, 7, Player::Red)]);
        let threats = detect_threats(&b, Player::Red);
        let three = threats.iter().find(|t| t.kind == ThreatKind::StraightThree).expect("expected an open three");
        assert_eq!(three.gain_squares.len(), 2);
    }

    #[test]
    fn broken_four_has_single_gain_square() {
        let cfg = BoardConfig::default();
        let b = board_with(cfg, &[(4, 7, Player::Red), (5, 7, Player::Red), (7, 7, Player::Red), (8, 7, Player::Red)]);
        let threats = detect_threats(&b, Player::Red);
        let four = threats.iter().find(|t| t.kind == ThreatKind::BrokenFour).expect("expected a broken four");
        assert_eq!(four.gain_squares, vec![Pos::new(6, 7)]);
    }
}
