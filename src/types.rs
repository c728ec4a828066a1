use crate::board::ChessMove;

pub type Score = i32;

pub const NEG_INF: Score = -9_999_999;
pub const POS_INF: Score = 9_999_999;
pub const IMMEDIATE_MATE: Score = 100_000;
/// A score is "mate-coded" iff its magnitude exceeds this threshold.
pub const MATE_THRESHOLD: Score = IMMEDIATE_MATE - 1000;

pub const MAX_PLY: usize = 64;
pub const DEFAULT_DEPTH: u8 = 7;
pub const DEFAULT_TIME_LIMIT_MS: u64 = 9_500;
pub const DEFAULT_HASH_MB: usize = 64;
/// Hard cap on transposition table size regardless of configured hash size.
pub const TT_CAPACITY: usize = 1 << 20;
pub const HISTORY_MAX: Score = 16_384;

pub struct EngineConfig {
    pub hash_mb: usize,
    pub book_path: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_mb: DEFAULT_HASH_MB,
            book_path: None,
        }
    }
}

pub struct SearchResult {
    pub best_move: Option<ChessMove>,
    pub score: Score,
    pub depth: u8,
    pub nodes: u64,
}

pub fn is_mate_score(score: Score) -> bool {
    score.abs() > MATE_THRESHOLD
}
