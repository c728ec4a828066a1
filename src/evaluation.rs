use crate::board::{Board, BoardStatus, Color, Square, ALL_SQUARES};

use crate::pst::{self, EG_TABLE, ENDGAME_DIVISOR, ENDGAME_WEIGHT, MG_TABLE, PIECE_VALUE};
use crate::types::{Score, IMMEDIATE_MATE};

/// Converts a board Square (a1=0, h8=63) into the PST's own a8=0 orientation.
/// White's home rank needs flipping (`sq ^ 56` maps rank1<->rank8, file unchanged);
/// Black's perspective already matches the table's natural orientation.
fn pst_index_white(sq: Square) -> usize {
    sq.to_index() ^ 56
}

fn pst_index_black(sq: Square) -> usize {
    sq.to_index()
}

/// `(material, endgame_weight)` for one side, computed from that side's own remaining
/// non-pawn material only (deliberately asymmetric: each side tapers independently).
fn material_info(board: &Board, color: Color) -> (Score, f64) {
    let mut material: Score = 0;
    let mut endgame_score: i32 = 0;

    for piece in crate::board::Piece::ALL {
        let count = (board.pieces(piece) & board.color_combined(color)).popcnt() as i32;
        let idx = pst::index_of(piece);
        material += PIECE_VALUE[idx] * count;
        endgame_score += ENDGAME_WEIGHT[idx] * count;
    }

    let endgame_weight = (1.0 - endgame_score as f64 / ENDGAME_DIVISOR as f64).max(0.0);
    (material, endgame_weight)
}

fn piece_square_value(board: &Board, color: Color, endgame_t: f64) -> Score {
    let mut value = 0.0f64;
    for sq in ALL_SQUARES {
        if board.piece_on(sq).is_none() || board.color_on(sq) != Some(color) {
            continue;
        }
        let piece = board.piece_on(sq).unwrap();
        let idx = pst::index_of(piece);
        let pst_idx = if color == Color::White {
            pst_index_white(sq)
        } else {
            pst_index_black(sq)
        };
        let mg = MG_TABLE[idx][pst_idx] as f64;
        let eg = EG_TABLE[idx][pst_idx] as f64;
        value += mg * (1.0 - endgame_t) + eg * endgame_t;
    }
    value.round() as Score
}

/// Static evaluation from the side-to-move's perspective.
///
/// Checkmate scores `-IMMEDIATE_MATE` (ply-adjusted by the caller); stalemate and
/// insufficient material score 0. Otherwise: flat material plus a tapered piece-square
/// bonus, where each side's midgame/endgame blend depends only on its own remaining
/// non-pawn material (not a single shared game-phase counter).
pub fn evaluate(board: &Board) -> Score {
    if board.status() == BoardStatus::Checkmate {
        return -IMMEDIATE_MATE;
    }
    if board.status() == BoardStatus::Stalemate || board.is_insufficient_material() {
        return 0;
    }

    let (white_mat, white_t) = material_info(board, Color::White);
    let (black_mat, black_t) = material_info(board, Color::Black);

    let white_score = white_mat + piece_square_value(board, Color::White, white_t);
    let black_score = black_mat + piece_square_value(board, Color::Black, black_t);

    let score = white_score - black_score;
    if board.side_to_move() == Color::White {
        score
    } else {
        -score
    }
}
