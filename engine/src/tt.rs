//! A bucketed, lock-free-readable transposition table.
//!
//! Each bucket is one cache line (four entries of two `AtomicU64`s each). Entries are packed by
//! value, not pointer, so a torn concurrent read only ever yields a `hash_part` mismatch (rejected
//! by the caller) rather than undefined behaviour.

use board::Pos;
use std::fmt::{Display, Formatter};
use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[repr(u8)]
pub enum NodeType {
    #[default]
    Exact = 0,
    FailHigh = 1,
    FailLow = 2,
}

impl NodeType {
    fn from_u8(v: u8) -> Option<NodeType> {
        match v {
            0 => Some(NodeType::Exact),
            1 => Some(NodeType::FailHigh),
            2 => Some(NodeType::FailLow),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, derive_more::Display)]
pub struct Age(u8);

impl Age {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

const MOVE_BITS: u32 = 9; // enough to index any cell on a 19x19 board, plus a "no move" sentinel
const NO_MOVE_INDEX: u64 = (1 << MOVE_BITS) - 1;
const HASH_PART_BITS: u32 = 64 - MOVE_BITS;
const HASH_PART_MASK: u64 = (1 << HASH_PART_BITS) - 1;

fn pack_age_and_bound(age: Age, bound: NodeType) -> u8 {
    (age.0 << 2) | (bound as u8)
}

fn unpack_age_and_bound(v: u8) -> (Age, Option<NodeType>) {
    (Age(v >> 2), NodeType::from_u8(v & 0b11))
}

/// `NodeType`'s unused discriminant (3), reserved as the "this slot has never been written, or was
/// just cleared" sentinel. A `TTEntry::new` can never produce this value since `bound` is always a
/// real `NodeType`, so seeing it back out of a slot unambiguously means "empty".
const EMPTY_AGE_AND_BOUND: u8 = 0b11;
const EMPTY_REST: u64 = (EMPTY_AGE_AND_BOUND as u64) << 8;

/// Value representation of one slot. Packed into two `u64`s for atomic storage; never itself
/// shared across threads.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TTEntry {
    pub hash_and_move: u64,
    pub score: i16,
    pub eval: i16,
    pub depth: u16,
    age_and_bound: u8,
}

impl Display for TTEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "move {:?} score {} bound {:?} age {} depth {}",
            self.best_move(),
            self.score,
            self.bound(),
            self.age(),
            self.depth
        )
    }
}

impl TTEntry {
    pub fn new(hash: u64, score: i32, eval: i32, best_move: Pos, depth: isize, bound: NodeType, age: Age) -> Self {
        let move_idx = best_move.x as u64 * 19 + best_move.y as u64; // fits in MOVE_BITS for any supported board
        let depth = depth.clamp(0, u16::MAX as isize) as u16;
        let hash_and_move = (move_idx << HASH_PART_BITS) | (hash & HASH_PART_MASK);
        Self {
            hash_and_move,
            score: score.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            eval: eval.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            depth,
            age_and_bound: pack_age_and_bound(age, bound),
        }
    }

    pub fn is_empty(&self) -> bool {
        unpack_age_and_bound(self.age_and_bound).1.is_none()
    }

    pub fn bound(&self) -> NodeType {
        unpack_age_and_bound(self.age_and_bound).1.expect("corrupt or uninitialized entry")
    }

    pub fn age(&self) -> Age {
        unpack_age_and_bound(self.age_and_bound).0
    }

    pub fn hash_part(&self) -> u64 {
        self.hash_and_move & HASH_PART_MASK
    }

    fn hash_part_of(hash: u64) -> u64 {
        hash & HASH_PART_MASK
    }

    pub fn best_move(&self) -> Option<Pos> {
        let idx = self.hash_and_move >> HASH_PART_BITS;
        if idx == NO_MOVE_INDEX {
            return None;
        }
        Some(Pos::new((idx / 19) as u8, (idx % 19) as u8))
    }

    fn pack(self, slot: &AtomicTTEntry) {
        let rest = ((self.score as u16 as u64) << 48)
            | ((self.eval as u16 as u64) << 32)
            | ((self.depth as u64) << 16)
            | (self.age_and_bound as u64) << 8;
        slot.hash_and_move.store(self.hash_and_move, Relaxed);
        slot.rest.store(rest, Relaxed);
    }

    fn unpack(slot: &AtomicTTEntry) -> Self {
        let hash_and_move = slot.hash_and_move.load(Relaxed);
        let rest = slot.rest.load(Relaxed);
        Self {
            hash_and_move,
            score: (rest >> 48) as i16,
            eval: (rest >> 32) as i16,
            depth: (rest >> 16) as u16,
            age_and_bound: (rest >> 8) as u8,
        }
    }
}

#[derive(Debug)]
#[repr(C)]
struct AtomicTTEntry {
    hash_and_move: AtomicU64,
    rest: AtomicU64,
}

impl AtomicTTEntry {
    fn empty() -> Self {
        Self { hash_and_move: AtomicU64::new(0), rest: AtomicU64::new(EMPTY_REST) }
    }

    fn reset(&self) {
        self.hash_and_move.store(0, Relaxed);
        self.rest.store(EMPTY_REST, Relaxed);
    }
}

const ENTRIES_PER_BUCKET: usize = 4;

#[derive(Debug)]
#[repr(align(64))]
struct TTBucket([AtomicTTEntry; ENTRIES_PER_BUCKET]);

impl TTBucket {
    fn empty() -> Self {
        Self(std::array::from_fn(|_| AtomicTTEntry::empty()))
    }
}

const _: () = assert!(std::mem::size_of::<TTBucket>() == 64);

pub const DEFAULT_HASH_SIZE_MB: usize = 16;

/// Resizing waits for any in-flight search to finish; workers hold their own `Arc` clone.
#[derive(Clone, Debug)]
pub struct TranspositionTable {
    buckets: Arc<[TTBucket]>,
    pub age: Age,
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::with_size_mib(DEFAULT_HASH_SIZE_MB)
    }
}

impl TranspositionTable {
    pub fn minimal() -> Self {
        Self::with_bytes(0)
    }

    pub fn with_size_mib(mib: usize) -> Self {
        Self::with_bytes(mib * (1 << 20))
    }

    fn with_bytes(bytes: usize) -> Self {
        let num_buckets = 1.max(bytes / std::mem::size_of::<TTBucket>());
        let mut buckets = Vec::with_capacity(num_buckets);
        buckets.resize_with(num_buckets, TTBucket::empty);
        log::debug!("allocated transposition table with {num_buckets} buckets ({} entries)", num_buckets * ENTRIES_PER_BUCKET);
        Self { buckets: buckets.into(), age: Age::default() }
    }

    pub fn size_in_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn size_in_mib(&self) -> usize {
        (self.buckets.len() * std::mem::size_of::<TTBucket>() + (1 << 19)) / (1 << 20)
    }

    pub fn clear(&mut self) {
        log::debug!("clearing transposition table, bumping generation to {:?}", self.age.0.wrapping_add(1));
        self.age.increment();
        for bucket in self.buckets.iter() {
            for slot in &bucket.0 {
                slot.reset();
            }
        }
    }

    fn bucket_index_of(&self, hash: u64) -> usize {
        ((hash as u128 * self.buckets.len() as u128) >> 64) as usize
    }

    fn replacement_score(candidate: TTEntry, to_insert: &TTEntry) -> isize {
        if candidate.is_empty() || candidate.hash_part() == to_insert.hash_part() {
            isize::MIN
        } else {
            let age_diff = to_insert.age().0.wrapping_sub(candidate.age().0) as isize;
            candidate.depth as isize - age_diff * 8
        }
    }

    pub fn store(&self, entry: TTEntry, hash: u64) {
        let bucket = &self.buckets[self.bucket_index_of(hash)].0;
        let (slot, _) = bucket
            .iter()
            .map(|s| (s, TTEntry::unpack(s)))
            .min_by_key(|(_, candidate)| Self::replacement_score(*candidate, &entry))
            .expect("bucket has at least one slot");
        entry.pack(slot);
    }

    pub fn load(&self, hash: u64) -> Option<TTEntry> {
        let bucket = &self.buckets[self.bucket_index_of(hash)].0;
        bucket
            .iter()
            .map(TTEntry::unpack)
            .find(|e| !e.is_empty() && e.hash_part() == TTEntry::hash_part_of(hash))
    }
}
