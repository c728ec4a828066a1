//! Polyglot opening book format reader.
//!
//! Polyglot books are binary files of 16-byte entries:
//! - 8 bytes: position hash (big-endian u64)
//! - 2 bytes: move encoding (big-endian u16)
//! - 2 bytes: weight (big-endian u16)
//! - 4 bytes: learn (big-endian u32)

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::board::{Board, ChessMove, File as BoardFile, MoveGen, Piece, Rank, Square};

/// A source of book moves, consulted before search runs.
pub trait Book: Send {
    fn lookup(&self, board: &Board) -> Option<ChessMove>;
}

/// Always misses. The default when no book is configured.
pub struct NoBook;

impl Book for NoBook {
    fn lookup(&self, _board: &Board) -> Option<ChessMove> {
        None
    }
}

#[derive(Debug, Clone)]
struct BookEntry {
    key: u64,
    move_data: u16,
    weight: u16,
}

impl BookEntry {
    fn from_bytes(bytes: &[u8; 16]) -> Self {
        BookEntry {
            key: u64::from_be_bytes(bytes[0..8].try_into().unwrap()),
            move_data: u16::from_be_bytes(bytes[8..10].try_into().unwrap()),
            weight: u16::from_be_bytes(bytes[10..12].try_into().unwrap()),
        }
    }

    fn decode_move(&self) -> (Square, Square, Option<Piece>) {
        let to_file = (self.move_data & 0x7) as u8;
        let to_rank = ((self.move_data >> 3) & 0x7) as u8;
        let from_file = ((self.move_data >> 6) & 0x7) as u8;
        let from_rank = ((self.move_data >> 9) & 0x7) as u8;
        let promo = (self.move_data >> 12) & 0x7;

        let from = Square::make_square(Rank::from_index(from_rank as usize), BoardFile::from_index(from_file as usize));
        let to = Square::make_square(Rank::from_index(to_rank as usize), BoardFile::from_index(to_file as usize));

        let promotion = match promo {
            1 => Some(Piece::Knight),
            2 => Some(Piece::Bishop),
            3 => Some(Piece::Rook),
            4 => Some(Piece::Queen),
            _ => None,
        };

        (from, to, promotion)
    }
}

/// An opening book loaded from a Polyglot-format file, kept sorted by hash for
/// binary search.
pub struct PolyglotBook {
    entries: Vec<BookEntry>,
}

impl PolyglotBook {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();

        loop {
            let mut buf = [0u8; 16];
            match reader.read_exact(&mut buf) {
                Ok(_) => entries.push(BookEntry::from_bytes(&buf)),
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
        }

        entries.sort_unstable_by_key(|e| e.key);
        Ok(PolyglotBook { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Polyglot's published hash is a from-scratch Zobrist scheme keyed on its own
    /// random table, not the engine's internal hash. We reuse the engine's own
    /// Zobrist hash instead of implementing Polyglot's — a real book file will not
    /// probe correctly against this until that's fixed.
    /// TODO: implement the actual Polyglot random-key hash.
    fn polyglot_hash(board: &Board) -> u64 {
        board.get_hash()
    }

    fn probe(&self, board: &Board) -> Vec<(ChessMove, u16)> {
        let hash = Self::polyglot_hash(board);
        let mut found = Vec::new();

        let idx = match self.entries.binary_search_by_key(&hash, |e| e.key) {
            Ok(i) => i,
            Err(_) => return found,
        };

        let mut i = idx;
        while i > 0 && self.entries[i - 1].key == hash {
            i -= 1;
        }

        let legal_moves: Vec<ChessMove> = MoveGen::new_legal(board).collect();

        while i < self.entries.len() && self.entries[i].key == hash {
            let entry = &self.entries[i];
            let (from, to, promotion) = entry.decode_move();

            if let Some(&mv) = legal_moves
                .iter()
                .find(|mv| mv.get_source() == from && mv.get_dest() == to && mv.get_promotion() == promotion)
            {
                found.push((mv, entry.weight));
            }

            i += 1;
        }

        found
    }
}

impl Book for PolyglotBook {
    fn lookup(&self, board: &Board) -> Option<ChessMove> {
        self.probe(board).into_iter().max_by_key(|(_, w)| *w).map(|(mv, _)| mv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_decode_e2e4() {
        let bytes = [
            0, 0, 0, 0, 0, 0, 0, 0, // key
            0x03, 0x1c, // move_data = 796: e2e4
            0, 100, // weight
            0, 0, 0, 0, // learn
        ];
        let entry = BookEntry::from_bytes(&bytes);
        let (from, to, promo) = entry.decode_move();
        assert_eq!(from.file().to_index(), 4);
        assert_eq!(from.rank().to_index(), 1);
        assert_eq!(to.file().to_index(), 4);
        assert_eq!(to.rank().to_index(), 3);
        assert_eq!(promo, None);
    }

    #[test]
    fn test_no_book_always_misses() {
        let book = NoBook;
        assert!(book.lookup(&Board::default()).is_none());
    }

    #[test]
    fn test_probe_missing_hash_returns_empty() {
        let book = PolyglotBook { entries: vec![] };
        assert!(book.probe(&Board::default()).is_empty());
        assert!(book.lookup(&Board::default()).is_none());
    }

    #[test]
    fn test_probe_matches_entry_with_same_hash() {
        let hash = Board::default().get_hash();
        let entries = vec![BookEntry {
            key: hash,
            move_data: 0x031c, // e2e4
            weight: 50,
        }];
        let book = PolyglotBook { entries };
        let mv = book.lookup(&Board::default());
        assert!(mv.is_some());
    }
}
