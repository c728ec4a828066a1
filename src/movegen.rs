use arrayvec::ArrayVec;
use crate::board::{Board, ChessMove, MoveGen, Piece};

use crate::pst::{self, PIECE_VALUE};
use crate::types::Score;

pub struct ScoredMove {
    pub mv: ChessMove,
    pub score: Score,
}

fn is_capture(board: &Board, mv: ChessMove) -> bool {
    board.piece_on(mv.get_dest()).is_some() || board.en_passant() == Some(mv.get_dest())
}

/// Score a single move per the engine's ordering table. Categories are additive except
/// the TT move, which short-circuits to an absolute top score.
fn score_move(
    board: &Board,
    mv: ChessMove,
    hash_move: Option<ChessMove>,
    killers: &[Option<ChessMove>; 2],
    history: &[[Score; 64]; 64],
) -> Score {
    if Some(mv) == hash_move {
        return 10_000_000;
    }

    let mut s: Score = 0;

    if let Some(victim) = board.piece_on(mv.get_dest()) {
        let attacker = board.piece_on(mv.get_source()).expect("move has no source piece");
        s += 10_000 + 10 * PIECE_VALUE[pst::index_of(victim)] - PIECE_VALUE[pst::index_of(attacker)];
    } else if board.en_passant() == Some(mv.get_dest()) {
        // En passant: both victim and attacker are pawns.
        s += 10_000 + 10 * PIECE_VALUE[pst::PAWN] - PIECE_VALUE[pst::PAWN];
    }

    if let Some(promo) = mv.get_promotion() {
        s += if promo == Piece::Queen { 2000 } else { 6000 };
    }

    if Some(mv) == killers[0] || Some(mv) == killers[1] {
        s += 4000;
    }

    s += history[mv.get_source().to_index()][mv.get_dest().to_index()];

    s
}

/// Generates and scores all legal moves for a node.
/// Priority: (1) TT move, (2) captures by MVV-LVA, (3) promotions, (4) killer moves,
/// (5) history heuristic. Categories 2-5 stack additively.
pub fn order_moves(
    board: &Board,
    hash_move: Option<ChessMove>,
    killers: &[Option<ChessMove>; 2],
    history: &[[Score; 64]; 64],
) -> ArrayVec<ScoredMove, 256> {
    let mut scored: ArrayVec<ScoredMove, 256> = ArrayVec::new();

    for mv in MoveGen::new_legal(board) {
        let score = score_move(board, mv, hash_move, killers, history);
        scored.push(ScoredMove { mv, score });
    }

    scored.sort_unstable_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Generates only capture and promotion moves for quiescence search, ordered by
/// MVV-LVA + promotion bonus (no TT/killer/history context at leaf extension).
pub fn order_captures(board: &Board) -> ArrayVec<ScoredMove, 256> {
    let mut scored: ArrayVec<ScoredMove, 256> = ArrayVec::new();

    for mv in MoveGen::new_legal(board) {
        if !is_capture(board, mv) && mv.get_promotion().is_none() {
            continue;
        }

        let mut score: Score = 0;
        if let Some(victim) = board.piece_on(mv.get_dest()) {
            let attacker = board.piece_on(mv.get_source()).expect("move has no source piece");
            score += 10_000 + 10 * PIECE_VALUE[pst::index_of(victim)] - PIECE_VALUE[pst::index_of(attacker)];
        } else if board.en_passant() == Some(mv.get_dest()) {
            score += 10_000 + 10 * PIECE_VALUE[pst::PAWN] - PIECE_VALUE[pst::PAWN];
        }
        if let Some(promo) = mv.get_promotion() {
            score += if promo == Piece::Queen { 2000 } else { 6000 };
        }

        scored.push(ScoredMove { mv, score });
    }

    scored.sort_unstable_by(|a, b| b.score.cmp(&a.score));
    scored
}
