//! The board itself: two disjoint per-player bitboards plus a Zobrist hash.
//!
//! Value-semantic: `place` takes `self` by value and returns a new `Board`. Since a `Board` is a
//! handful of `Copy` fields, this is a cheap bit-copy, not an allocation.

use crate::bitboard::Bitboard;
use crate::error::BoardError;
use crate::geometry::{BoardConfig, Player, Pos};
use crate::zobrist::ZOBRIST;
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Board {
    config: BoardConfig,
    red: Bitboard,
    blue: Bitboard,
    move_count: u32,
    hash: u64,
    last_move: Pos,
}

impl Board {
    pub fn empty(config: BoardConfig) -> Self {
        Self { config, red: Bitboard::EMPTY, blue: Bitboard::EMPTY, move_count: 0, hash: 0, last_move: Pos::INVALID }
    }

    #[inline]
    pub fn config(&self) -> BoardConfig {
        self.config
    }

    #[inline]
    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn last_move(&self) -> Pos {
        self.last_move
    }

    #[inline]
    pub fn bitboard(&self, player: Player) -> Bitboard {
        match player {
            Player::Red => self.red,
            Player::Blue => self.blue,
            Player::None => !(self.red | self.blue) & Bitboard::valid_cells(self.config),
        }
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.red | self.blue
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.move_count as usize >= self.config.num_cells()
    }

    pub fn cell(&self, pos: Pos) -> Player {
        if !self.config.in_bounds(pos) {
            return Player::None;
        }
        let idx = self.config.index_of(pos);
        if self.red.test(idx) {
            Player::Red
        } else if self.blue.test(idx) {
            Player::Blue
        } else {
            Player::None
        }
    }

    #[inline]
    pub fn side_to_move(&self) -> Player {
        if self.move_count % 2 == 0 { Player::Red } else { Player::Blue }
    }

    /// Returns a new board with `player` placed at `pos`. Fails if the cell is occupied or the
    /// coordinate is off-board; never mutates `self`.
    pub fn place(&self, pos: Pos, player: Player) -> Result<Board, BoardError> {
        if !self.config.in_bounds(pos) {
            log::trace!("rejected placement of {player} at {pos}: out of bounds");
            return Err(BoardError::InvalidCoordinate(pos));
        }
        if self.cell(pos) != Player::None {
            log::trace!("rejected placement of {player} at {pos}: cell occupied");
            return Err(BoardError::CellOccupied(pos));
        }
        debug_assert!(player.is_some(), "cannot place Player::None");
        let idx = self.config.index_of(pos);
        let mut next = *self;
        match player {
            Player::Red => next.red.set(idx),
            Player::Blue => next.blue.set(idx),
            Player::None => unreachable!(),
        }
        next.move_count += 1;
        next.last_move = pos;
        next.hash ^= ZOBRIST.piece_key(idx, player);
        next.hash ^= ZOBRIST.side_to_move_key;
        Ok(next)
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for row in (0..self.config.height).rev() {
            for col in 0..self.config.width {
                let c = match self.cell(Pos::new(col, row)) {
                    Player::Red => 'X',
                    Player::Blue => 'O',
                    Player::None => '.',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
