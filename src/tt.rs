use std::collections::HashMap;

use crate::board::ChessMove;
use crate::types::{Score, MATE_THRESHOLD, TT_CAPACITY};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TTFlag {
    Exact,
    LowerBound, // Beta cutoff (score >= beta)
    UpperBound, // Failed low (score <= alpha)
}

#[derive(Clone, Copy)]
pub struct TTEntry {
    pub depth: u8,
    pub score: Score,
    pub flag: TTFlag,
    pub best_move: Option<ChessMove>,
}

/// Transposition table capped at `TT_CAPACITY` entries. No bucketed replacement: an
/// insert that would exceed capacity clears the whole table first. Simplicity over
/// density — a reviewer should be able to see the cutoff semantics at a glance.
pub struct TranspositionTable {
    table: HashMap<u64, TTEntry>,
    capacity: usize,
}

impl TranspositionTable {
    /// Create a new TT sized from a hash-size-in-MB configuration value, capped at
    /// `TT_CAPACITY` regardless of what the configuration requests.
    pub fn new(mb: usize) -> Self {
        let entry_size = std::mem::size_of::<(u64, TTEntry)>();
        let requested = (mb * 1024 * 1024) / entry_size.max(1);
        let capacity = requested.clamp(1024, TT_CAPACITY);
        Self {
            table: HashMap::with_capacity(capacity.min(1 << 16)),
            capacity,
        }
    }

    pub fn probe(&self, hash: u64) -> Option<&TTEntry> {
        self.table.get(&hash)
    }

    /// Retrieve score from TT entry, adjusting mate scores for current ply, and decide
    /// whether the entry permits an immediate cutoff against `alpha`/`beta`.
    pub fn retrieve_score(entry: &TTEntry, ply: usize, alpha: Score, beta: Score) -> Option<Score> {
        let mut score = entry.score;

        if score > MATE_THRESHOLD {
            score -= ply as Score;
        } else if score < -MATE_THRESHOLD {
            score += ply as Score;
        }

        match entry.flag {
            TTFlag::Exact => Some(score),
            TTFlag::LowerBound => {
                if score >= beta { Some(score) } else { None }
            }
            TTFlag::UpperBound => {
                if score <= alpha { Some(score) } else { None }
            }
        }
    }

    /// Store a position. Mate scores are adjusted to be relative to the root rather
    /// than the current ply before storage, and re-adjusted back out on retrieval.
    pub fn store(
        &mut self,
        hash: u64,
        depth: u8,
        mut score: Score,
        flag: TTFlag,
        best_move: Option<ChessMove>,
        ply: usize,
    ) {
        if score > MATE_THRESHOLD {
            score += ply as Score;
        } else if score < -MATE_THRESHOLD {
            score -= ply as Score;
        }

        if self.table.len() >= self.capacity && !self.table.contains_key(&hash) {
            self.table.clear();
        }

        self.table.insert(hash, TTEntry { depth, score, flag, best_move });
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NEG_INF, POS_INF};

    #[test]
    fn test_tt_store_and_probe() {
        let mut tt = TranspositionTable::new(1);
        let hash: u64 = 0x123456789ABCDEF0;

        tt.store(hash, 5, 100, TTFlag::Exact, None, 0);

        let entry = tt.probe(hash);
        assert!(entry.is_some());
        let entry = entry.unwrap();
        assert_eq!(entry.depth, 5);
        assert_eq!(entry.score, 100);
        assert_eq!(entry.flag, TTFlag::Exact);
    }

    #[test]
    fn test_tt_miss() {
        let tt = TranspositionTable::new(1);
        assert!(tt.probe(0xDEADBEEF).is_none());
    }

    #[test]
    fn test_mate_score_adjustment() {
        let mut tt = TranspositionTable::new(1);
        let hash: u64 = 0xABCDEF;

        let mate_score = crate::types::IMMEDIATE_MATE - 3;
        tt.store(hash, 10, mate_score, TTFlag::Exact, None, 3);

        let entry = tt.probe(hash).unwrap();
        assert_eq!(entry.score, crate::types::IMMEDIATE_MATE);

        let retrieved = TranspositionTable::retrieve_score(entry, 5, NEG_INF, POS_INF);
        assert_eq!(retrieved, Some(crate::types::IMMEDIATE_MATE - 5));
    }

    #[test]
    fn test_tt_overwrite_same_key() {
        let mut tt = TranspositionTable::new(1);
        let hash: u64 = 0x12345;

        tt.store(hash, 3, 50, TTFlag::Exact, None, 0);
        tt.store(hash, 6, 75, TTFlag::Exact, None, 0);

        let entry = tt.probe(hash).unwrap();
        assert_eq!(entry.depth, 6);
        assert_eq!(entry.score, 75);
    }

    #[test]
    fn test_clear_on_overflow() {
        let mut tt = TranspositionTable {
            table: HashMap::new(),
            capacity: 4,
        };
        for i in 0..4u64 {
            tt.store(i, 1, 0, TTFlag::Exact, None, 0);
        }
        assert_eq!(tt.len(), 4);
        // Fifth distinct key exceeds capacity: table is cleared before the insert.
        tt.store(100, 1, 0, TTFlag::Exact, None, 0);
        assert_eq!(tt.len(), 1);
    }
}
