use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board::{Board, BoardStatus, ChessMove, MoveGen, Piece};

use crate::book::{Book, NoBook};
use crate::evaluation::evaluate;
use crate::game::Game;
use crate::movegen::{order_captures, order_moves};
use crate::tt::{TTFlag, TranspositionTable};
use crate::types::{
    is_mate_score, Score, SearchResult, DEFAULT_HASH_MB, HISTORY_MAX, IMMEDIATE_MATE, MAX_PLY,
    NEG_INF, POS_INF,
};

/// Per-depth progress, handed to an optional caller-supplied callback. The library never
/// prints this itself — an embedder (e.g. a UCI front-end) decides how to display it.
#[derive(Clone, Debug)]
pub struct SearchProgress {
    pub depth: u8,
    pub score: Score,
    pub best_move: Option<ChessMove>,
    pub nodes: u64,
    pub elapsed_ms: u64,
}

/// Mutable search state shared across recursion, owned by a `Searcher` for its lifetime.
pub struct SearchState {
    pub nodes: u64,
    pub start_time: Instant,
    pub stop: Arc<AtomicBool>,
    pub time_limit_ms: u64,
    pub killers: [[Option<ChessMove>; 2]; MAX_PLY],
    pub history: [[Score; 64]; 64],
    pub tt: TranspositionTable,
    pub root_best_move: Option<ChessMove>,
    /// Positions visited on the current search path (pushed/popped around recursion).
    pub repetition_stack: Vec<u64>,
    /// Hashes of positions actually reached earlier in the real game, supplied fresh
    /// before each `find_move` call. Read-only during search.
    pub game_history: Vec<u64>,
}

impl SearchState {
    pub fn new() -> Self {
        Self {
            nodes: 0,
            start_time: Instant::now(),
            stop: Arc::new(AtomicBool::new(false)),
            time_limit_ms: 0,
            killers: [[None; 2]; MAX_PLY],
            history: [[0; 64]; 64],
            tt: TranspositionTable::new(DEFAULT_HASH_MB),
            root_best_move: None,
            repetition_stack: Vec::new(),
            game_history: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.nodes = 0;
        self.stop.store(false, Ordering::SeqCst);
        self.killers = [[None; 2]; MAX_PLY];
        self.history = [[0; 64]; 64];
        self.start_time = Instant::now();
        self.root_best_move = None;
        self.repetition_stack.clear();
    }

    pub fn resize_tt(&mut self, mb: usize) {
        self.tt = TranspositionTable::new(mb);
    }

    fn check_time(&self) {
        if self.time_limit_ms > 0 {
            let elapsed = self.start_time.elapsed().as_millis() as u64;
            if elapsed >= self.time_limit_ms {
                self.stop.store(true, Ordering::Relaxed);
            }
        }
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn is_historical_repetition(&self, hash: u64) -> bool {
        self.game_history.iter().filter(|&&h| h == hash).count() >= 2
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns search state plus an optional opening book; this is the library's public contract.
pub struct Searcher {
    state: SearchState,
    book: Box<dyn Book>,
}

impl Searcher {
    pub fn new() -> Self {
        Self {
            state: SearchState::new(),
            book: Box::new(NoBook),
        }
    }

    pub fn with_book(book: Box<dyn Book>) -> Self {
        Self {
            state: SearchState::new(),
            book,
        }
    }

    pub fn set_book(&mut self, book: Box<dyn Book>) {
        self.book = book;
    }

    pub fn set_hash_size(&mut self, mb: usize) {
        self.state.resize_tt(mb);
    }

    pub fn clear_hash(&mut self) {
        self.state.tt.clear();
    }

    /// An external stop flag an embedder can set from another thread (e.g. on a UCI
    /// `stop` command) to cancel the in-flight search. ORed into the internal flag.
    pub fn set_stop_flag(&mut self, flag: Arc<AtomicBool>) {
        self.state.stop = flag;
    }

    pub fn node_count(&self) -> u64 {
        self.state.nodes
    }

    /// Find the best move for the position in `game`, searching up to `max_depth` or
    /// `time_limit`, whichever comes first. Consults the book before searching.
    pub fn find_move(&mut self, game: &Game, max_depth: u8, time_limit: Duration) -> Option<ChessMove> {
        self.find_move_with_progress(game, max_depth, time_limit, None)
    }

    pub fn find_move_with_progress(
        &mut self,
        game: &Game,
        max_depth: u8,
        time_limit: Duration,
        on_progress: Option<&mut dyn FnMut(SearchProgress)>,
    ) -> Option<ChessMove> {
        if let Some(mv) = self.book.lookup(&game.board) {
            return Some(mv);
        }

        let legal: Vec<ChessMove> = MoveGen::new_legal(&game.board).collect();
        if legal.is_empty() {
            return None;
        }
        if legal.len() == 1 {
            return Some(legal[0]);
        }

        self.state.reset();
        self.state.time_limit_ms = time_limit.as_millis() as u64;
        self.state.game_history = game.history.clone();

        let result = search(&game.board, &mut self.state, max_depth, on_progress);
        result.best_move
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a score for UCI-style display (centipawns or mate-in-N).
pub fn format_score(score: Score) -> String {
    if is_mate_score(score) {
        let mate_ply = IMMEDIATE_MATE - score.abs();
        let mate_moves = (mate_ply + 1) / 2;
        if score > 0 {
            format!("score mate {}", mate_moves)
        } else {
            format!("score mate -{}", mate_moves)
        }
    } else {
        format!("score cp {}", score)
    }
}

/// Extract the principal variation by following the TT's best-move chain.
pub fn extract_pv(board: &Board, tt: &TranspositionTable, max_moves: usize) -> Vec<ChessMove> {
    let mut pv = Vec::new();
    let mut current_board = *board;
    let mut seen: Vec<u64> = Vec::new();

    for _ in 0..max_moves {
        let hash = current_board.get_hash();
        if seen.contains(&hash) {
            break;
        }
        seen.push(hash);

        match tt.probe(hash).and_then(|e| e.best_move) {
            Some(mv) if current_board.legal(mv) => {
                pv.push(mv);
                current_board = current_board.make_move_new(mv);
            }
            _ => break,
        }
    }

    pv
}

/// Iterative deepening driver. Discards a depth's results entirely if it was
/// interrupted by the deadline — the partial tree at that depth is not trustworthy.
fn search(
    board: &Board,
    state: &mut SearchState,
    max_depth: u8,
    mut on_progress: Option<&mut dyn FnMut(SearchProgress)>,
) -> SearchResult {
    let mut best_move: Option<ChessMove> = None;
    let mut best_score: Score = 0;
    let mut completed_depth: u8 = 0;

    for depth in 1..=max_depth {
        if state.time_limit_ms > 0 {
            let elapsed = state.start_time.elapsed().as_millis() as u64;
            if elapsed >= state.time_limit_ms {
                break;
            }
        }

        state.root_best_move = None;
        let score = negamax(board, state, depth, 0, NEG_INF, POS_INF, true);

        if state.is_stopped() {
            // This depth's tree is incomplete; fall back to a partial root move only
            // if no earlier depth ever finished.
            if best_move.is_none() {
                best_move = state.root_best_move;
            }
            break;
        }

        best_score = score;
        completed_depth = depth;
        if let Some(mv) = state.root_best_move {
            best_move = Some(mv);
        }

        if let Some(cb) = on_progress.as_deref_mut() {
            cb(SearchProgress {
                depth,
                score: best_score,
                best_move,
                nodes: state.nodes,
                elapsed_ms: state.start_time.elapsed().as_millis() as u64,
            });
        }

        if is_mate_score(best_score) {
            let mate_distance = IMMEDIATE_MATE - best_score.abs();
            if mate_distance <= depth as Score {
                break;
            }
        }
    }

    SearchResult {
        best_move,
        score: best_score,
        depth: completed_depth,
        nodes: state.nodes,
    }
}

/// Late-move-reduction base: floor(0.75 + ln(depth)*ln(move_number) / 2.25).
fn lmr_base_reduction(depth: u8, move_number: usize) -> i32 {
    let d = depth as f64;
    let m = move_number as f64;
    (0.75 + d.ln() * m.ln() / 2.25).floor() as i32
}

/// Negamax with alpha-beta pruning, TT, null-move pruning, PVS and LMR.
fn negamax(
    board: &Board,
    state: &mut SearchState,
    depth: u8,
    ply: usize,
    mut alpha: Score,
    beta: Score,
    can_null: bool,
) -> Score {
    state.nodes += 1;
    if state.nodes & 1023 == 0 {
        state.check_time();
    }
    if state.is_stopped() {
        return 0;
    }

    let hash = board.get_hash();

    if ply > 0 && (state.repetition_stack.contains(&hash) || state.is_historical_repetition(hash)) {
        return 0;
    }

    let mut hash_move: Option<ChessMove> = None;
    if let Some(entry) = state.tt.probe(hash) {
        hash_move = entry.best_move;
        if entry.depth >= depth {
            if let Some(score) = TranspositionTable::retrieve_score(entry, ply, alpha, beta) {
                return score;
            }
        }
    }

    match board.status() {
        BoardStatus::Checkmate => return -(IMMEDIATE_MATE - ply as Score),
        BoardStatus::Stalemate => return 0,
        BoardStatus::Ongoing if board.is_insufficient_material() => return 0,
        BoardStatus::Ongoing => {}
    }

    if depth == 0 {
        return quiescence(board, state, ply, alpha, beta);
    }

    if ply >= MAX_PLY - 1 {
        return quiescence(board, state, ply, alpha, beta);
    }

    let in_check = !board.checkers().is_empty();

    // Null-move pruning: skip our turn; if the opponent still can't beat beta even
    // with a free move, our real position is at least that good.
    if can_null && !in_check && depth >= 3 && ply > 0 {
        let our_pieces = board.color_combined(board.side_to_move());
        let pawns_and_king = board.pieces(Piece::Pawn) | board.pieces(Piece::King);
        let has_non_pawn_material = !(our_pieces & !pawns_and_king).is_empty();

        if has_non_pawn_material {
            if let Some(null_board) = board.null_move() {
                let r: u8 = if depth >= 6 { 3 } else { 2 };
                state.repetition_stack.push(hash);
                let score = -negamax(&null_board, state, depth - 1 - r, ply + 1, -beta, -beta + 1, false);
                state.repetition_stack.pop();

                if state.is_stopped() {
                    return 0;
                }
                if score >= beta && !is_mate_score(score) {
                    return beta;
                }
            }
        }
    }

    let moves = order_moves(board, hash_move, &state.killers[ply], &state.history);
    if moves.is_empty() {
        return 0;
    }

    let is_pv = beta - alpha > 1;
    let original_alpha = alpha;

    state.repetition_stack.push(hash);

    let mut best_score = NEG_INF;
    let mut best_move: Option<ChessMove> = None;

    for (i, scored_move) in moves.iter().enumerate() {
        let n = i + 1;
        let mv = scored_move.mv;
        let is_capture = board.piece_on(mv.get_dest()).is_some() || board.en_passant() == Some(mv.get_dest());
        let is_promo = mv.get_promotion().is_some();
        let new_board = board.make_move_new(mv);
        let gives_check = !new_board.checkers().is_empty();

        let is_killer = Some(mv) == state.killers[ply][0] || Some(mv) == state.killers[ply][1];
        let do_lmr = depth >= 3
            && n > 2 + 2 * (is_pv as usize)
            && !in_check
            && !is_capture
            && !is_promo
            && !gives_check;

        let val = if do_lmr {
            let mut r = lmr_base_reduction(depth, n);
            r += if !is_pv { 1 } else { 0 };
            r += 1; // move does not give check, by construction of do_lmr
            if Some(mv) == hash_move || is_killer {
                r -= 2;
            }
            r -= state.history[mv.get_source().to_index()][mv.get_dest().to_index()] / 4000;
            r = r.clamp(1, (depth - 1) as i32);

            let reduced = -negamax(&new_board, state, depth - r as u8, ply + 1, -alpha - 1, -alpha, true);
            if reduced > alpha && r > 1 {
                pvs_research(&new_board, state, depth, ply, alpha, beta, is_pv, false)
            } else {
                reduced
            }
        } else {
            pvs_research(&new_board, state, depth, ply, alpha, beta, is_pv, i == 0)
        };

        if state.is_stopped() {
            state.repetition_stack.pop();
            return best_score;
        }

        if val > best_score {
            best_score = val;
            best_move = Some(mv);
            if ply == 0 {
                state.root_best_move = Some(mv);
            }
        }

        if val > alpha {
            alpha = val;
        }

        if alpha >= beta {
            if !is_capture && !is_promo {
                state.killers[ply][1] = state.killers[ply][0];
                state.killers[ply][0] = Some(mv);

                let from = mv.get_source().to_index();
                let to = mv.get_dest().to_index();
                state.history[from][to] = (state.history[from][to] + (depth as Score) * (depth as Score))
                    .min(HISTORY_MAX);
            }
            break;
        }
    }

    state.repetition_stack.pop();

    let flag = if best_score >= beta {
        TTFlag::LowerBound
    } else if best_score <= original_alpha {
        TTFlag::UpperBound
    } else {
        TTFlag::Exact
    };
    state.tt.store(hash, depth, best_score, flag, best_move, ply);

    best_score
}

/// PVS re-search: the first move of a PV node gets the full window; every other move
/// gets a zero-window probe, re-searched at full window only if it lands inside it.
fn pvs_research(
    new_board: &Board,
    state: &mut SearchState,
    depth: u8,
    ply: usize,
    alpha: Score,
    beta: Score,
    is_pv: bool,
    first_move: bool,
) -> Score {
    if is_pv && first_move {
        return -negamax(new_board, state, depth - 1, ply + 1, -beta, -alpha, true);
    }

    let val = -negamax(new_board, state, depth - 1, ply + 1, -alpha - 1, -alpha, true);
    if is_pv && val > alpha && val < beta {
        -negamax(new_board, state, depth - 1, ply + 1, -beta, -alpha, true)
    } else {
        val
    }
}

/// Quiescence search: captures and promotions only, with a stand-pat floor. No special
/// in-check handling — a position already checkmated is caught by `evaluate`.
fn quiescence(board: &Board, state: &mut SearchState, ply: usize, mut alpha: Score, beta: Score) -> Score {
    state.nodes += 1;

    if state.is_stopped() {
        return evaluate(board);
    }

    let stand_pat = evaluate(board);
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    if ply >= MAX_PLY {
        return alpha;
    }

    let captures = order_captures(board);
    for scored_move in &captures {
        let new_board = board.make_move_new(scored_move.mv);
        let score = -quiescence(&new_board, state, ply + 1, -beta, -alpha);

        if state.is_stopped() {
            return alpha;
        }
        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }

    alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;
    use std::str::FromStr;
    use std::time::Duration;

    fn game_from_fen(fen: &str) -> Game {
        Game::new(Board::from_str(fen).unwrap())
    }

    #[test]
    fn test_search_finds_move() {
        let game = Game::new(Board::default());
        let mut searcher = Searcher::new();
        let mv = searcher.find_move(&game, 3, Duration::from_secs(5));
        assert!(mv.is_some());
    }

    #[test]
    fn test_search_finds_mate_in_one() {
        let game = game_from_fen("r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4");
        let mut searcher = Searcher::new();
        let mv = searcher.find_move(&game, 2, Duration::from_secs(5)).unwrap();
        assert_eq!(mv.to_string(), "h5f7", "Expected Qxf7# but got {}", mv);
    }

    #[test]
    fn test_checkmate_score() {
        let board = Board::from_str("rnbqkbnr/pppp1ppp/4p3/8/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        let mut state = SearchState::new();
        let score = negamax(&board, &mut state, 1, 0, NEG_INF, POS_INF, true);
        assert!(score < -(IMMEDIATE_MATE - 200), "Checkmate score should be very negative, got {}", score);
    }

    #[test]
    fn test_stalemate_is_draw() {
        let board = Board::from_str("k7/2Q5/1K6/8/8/8/8/8 b - - 0 1").unwrap();
        let mut state = SearchState::new();
        let score = negamax(&board, &mut state, 3, 0, NEG_INF, POS_INF, true);
        assert_eq!(score, 0);
    }

    #[test]
    fn test_tt_reduces_nodes() {
        let game = Game::new(Board::default());
        let mut searcher = Searcher::new();
        searcher.find_move(&game, 4, Duration::from_secs(5));
        let nodes_first = searcher.node_count();

        searcher.find_move(&game, 4, Duration::from_secs(5));
        let nodes_second = searcher.node_count();

        assert!(
            nodes_second <= nodes_first,
            "Second search ({} nodes) should use <= first ({} nodes) due to TT",
            nodes_second,
            nodes_first
        );
    }

    #[test]
    fn test_search_path_repetition_is_zero() {
        let board = Board::default();
        let mut state = SearchState::new();
        state.repetition_stack.push(board.get_hash());
        let score = negamax(&board, &mut state, 3, 1, NEG_INF, POS_INF, true);
        assert_eq!(score, 0, "Repeated position should return 0 (draw), got {}", score);
    }

    #[test]
    fn test_historical_repetition_is_zero() {
        let board = Board::default();
        let mut state = SearchState::new();
        state.game_history = vec![board.get_hash(), board.get_hash()];
        let score = negamax(&board, &mut state, 3, 1, NEG_INF, POS_INF, true);
        assert_eq!(score, 0);
    }

    #[test]
    fn test_single_legal_move_short_circuits() {
        // King has exactly one legal move: escape the only checking square, forced.
        let game = game_from_fen("7k/8/8/8/8/8/6q1/K7 w - - 0 1");
        let mut searcher = Searcher::new();
        let mv = searcher.find_move(&game, 5, Duration::from_secs(5));
        assert!(mv.is_some());
        assert_eq!(searcher.node_count(), 0, "single legal move must bypass search entirely");
    }

    #[test]
    fn test_stop_preserves_best_move() {
        let game = Game::new(Board::default());
        let mut searcher = Searcher::new();
        let mv = searcher.find_move(&game, 20, Duration::from_millis(1));
        assert!(mv.is_some(), "Should find a move even when stopped early");
    }

    #[test]
    fn test_pv_extraction() {
        let board = Board::default();
        let game = Game::new(board);
        let mut searcher = Searcher::new();
        searcher.find_move(&game, 4, Duration::from_secs(5));
        let pv = extract_pv(&board, &searcher.state.tt, 4);
        assert!(!pv.is_empty(), "PV should contain at least one move after search");
    }

    #[test]
    fn test_mate_score_format() {
        assert_eq!(format_score(IMMEDIATE_MATE - 1), "score mate 1");
        assert_eq!(format_score(IMMEDIATE_MATE - 3), "score mate 2");
        assert_eq!(format_score(-(IMMEDIATE_MATE - 1)), "score mate -1");
        assert_eq!(format_score(-(IMMEDIATE_MATE - 3)), "score mate -2");
        assert_eq!(format_score(100), "score cp 100");
        assert_eq!(format_score(-50), "score cp -50");
    }
}
