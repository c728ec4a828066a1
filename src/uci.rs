
use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::board::{Board, ChessMove, Color, File, Piece, Rank, Square};

use crate::book::{Book, NoBook, PolyglotBook};
use crate::game::Game;
use crate::search::{self, Searcher};
use crate::types::{EngineConfig, DEFAULT_DEPTH};

pub fn run() {
    let stdin = io::stdin();

    let mut game = Game::default();
    let mut config = EngineConfig::default();
    let mut searcher: Option<Searcher> = Some(Searcher::new());
    let mut stop_flag: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    let mut search_thread: Option<thread::JoinHandle<Searcher>> = None;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        match tokens[0] {
            "uci" => {
                println!("id name gambit");
                println!("id author yourname");
                println!("option name Hash type spin default 64 min 1 max 4096");
                println!("option name BookPath type string default <empty>");
                println!("uciok");
            }
            "isready" => {
                wait_for_search(&mut search_thread, &mut searcher);
                println!("readyok");
            }
            "ucinewgame" => {
                wait_for_search(&mut search_thread, &mut searcher);
                game.reset(Board::default());
                if let Some(ref mut s) = searcher {
                    s.clear_hash();
                }
            }
            "position" => {
                wait_for_search(&mut search_thread, &mut searcher);
                parse_position(&tokens, &mut game);
            }
            "go" => {
                wait_for_search(&mut search_thread, &mut searcher);

                let go_params = parse_go(&tokens);
                let max_depth = go_params.depth.unwrap_or(DEFAULT_DEPTH);
                let time_limit_ms = go_params.compute_time_ms(game.board.side_to_move());
                let time_limit = if time_limit_ms == 0 {
                    std::time::Duration::from_secs(3600)
                } else {
                    std::time::Duration::from_millis(time_limit_ms)
                };

                let flag = Arc::new(AtomicBool::new(false));
                stop_flag = flag.clone();

                let mut s = searcher.take().expect("searcher missing");
                s.set_stop_flag(flag);

                let game_copy = game.clone();

                search_thread = Some(thread::spawn(move || {
                    let started = std::time::Instant::now();
                    let best = s.find_move_with_progress(
                        &game_copy,
                        max_depth,
                        time_limit,
                        Some(&mut |progress: search::SearchProgress| {
                            let elapsed_ms = progress.elapsed_ms.max(1);
                            let nps = progress.nodes * 1000 / elapsed_ms;
                            let score_str = search::format_score(progress.score);
                            println!(
                                "info depth {} {} nodes {} time {} nps {}",
                                progress.depth, score_str, progress.nodes, elapsed_ms, nps
                            );
                        }),
                    );
                    let _ = started;

                    match best {
                        Some(m) => println!("bestmove {}", m),
                        None => println!("bestmove 0000"),
                    }

                    s
                }));
            }
            "stop" => {
                stop_flag.store(true, Ordering::SeqCst);
                wait_for_search(&mut search_thread, &mut searcher);
            }
            "setoption" => {
                wait_for_search(&mut search_thread, &mut searcher);
                if let Some(ref mut s) = searcher {
                    parse_setoption(&tokens, &mut config, s);
                }
            }
            "quit" => {
                stop_flag.store(true, Ordering::SeqCst);
                wait_for_search(&mut search_thread, &mut searcher);
                break;
            }
            "d" | "print" => {
                println!("{}", game.board);
            }
            _ => {}
        }
    }
}

/// Wait for a running search thread to finish and recover the Searcher.
fn wait_for_search(handle: &mut Option<thread::JoinHandle<Searcher>>, searcher: &mut Option<Searcher>) {
    if let Some(h) = handle.take() {
        match h.join() {
            Ok(s) => *searcher = Some(s),
            Err(_) => *searcher = Some(Searcher::new()),
        }
    }
}

/// Parsed `go` command parameters.
struct GoParams {
    depth: Option<u8>,
    movetime: Option<u64>,
    wtime: Option<u64>,
    btime: Option<u64>,
    winc: Option<u64>,
    binc: Option<u64>,
    moves_to_go: Option<u64>,
    infinite: bool,
}

impl GoParams {
    fn new() -> Self {
        Self {
            depth: None,
            movetime: None,
            wtime: None,
            btime: None,
            winc: None,
            binc: None,
            moves_to_go: None,
            infinite: false,
        }
    }

    /// Compute the time limit for this search in milliseconds. 0 means unbounded
    /// (the caller should treat it as depth-limited only).
    fn compute_time_ms(&self, side: Color) -> u64 {
        if self.infinite {
            return 0;
        }
        if let Some(mt) = self.movetime {
            return mt;
        }

        let (my_time, my_inc) = if side == Color::White {
            (self.wtime.unwrap_or(0), self.winc.unwrap_or(0))
        } else {
            (self.btime.unwrap_or(0), self.binc.unwrap_or(0))
        };

        if my_time == 0 {
            return 0;
        }

        let moves_left = self.moves_to_go.unwrap_or(30);
        let base = my_time / moves_left.max(1);
        let inc_bonus = my_inc * 3 / 4;
        let allocated = base + inc_bonus;

        // Don't use more than 80% of remaining time
        allocated.min(my_time * 4 / 5)
    }
}

fn parse_go(tokens: &[&str]) -> GoParams {
    let mut params = GoParams::new();
    let mut i = 1;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                if i < tokens.len() {
                    params.depth = tokens[i].parse().ok();
                }
            }
            "movetime" => {
                i += 1;
                if i < tokens.len() {
                    params.movetime = tokens[i].parse().ok();
                }
            }
            "wtime" => {
                i += 1;
                if i < tokens.len() {
                    params.wtime = tokens[i].parse().ok();
                }
            }
            "btime" => {
                i += 1;
                if i < tokens.len() {
                    params.btime = tokens[i].parse().ok();
                }
            }
            "winc" => {
                i += 1;
                if i < tokens.len() {
                    params.winc = tokens[i].parse().ok();
                }
            }
            "binc" => {
                i += 1;
                if i < tokens.len() {
                    params.binc = tokens[i].parse().ok();
                }
            }
            "movestogo" => {
                i += 1;
                if i < tokens.len() {
                    params.moves_to_go = tokens[i].parse().ok();
                }
            }
            "infinite" => {
                params.infinite = true;
            }
            _ => {}
        }
        i += 1;
    }

    params
}

fn parse_position(tokens: &[&str], game: &mut Game) {
    if tokens.len() < 2 {
        return;
    }

    let mut idx = 1;

    let board = if tokens[idx] == "startpos" {
        idx += 1;
        Board::default()
    } else if tokens[idx] == "fen" {
        idx += 1;
        let mut fen_parts: Vec<&str> = Vec::new();
        while idx < tokens.len() && tokens[idx] != "moves" && fen_parts.len() < 6 {
            fen_parts.push(tokens[idx]);
            idx += 1;
        }
        if fen_parts.len() < 4 {
            return;
        }
        match Board::from_str(&fen_parts.join(" ")) {
            Ok(b) => b,
            Err(_) => return,
        }
    } else {
        return;
    };

    game.reset(board);

    if idx < tokens.len() && tokens[idx] == "moves" {
        idx += 1;
        for &move_str in &tokens[idx..] {
            if let Some(m) = parse_uci_move(&game.board, move_str) {
                game.push_move(m);
            }
        }
    }
}

/// Parse a UCI move string directly into squares + optional promotion piece.
fn parse_uci_move(board: &Board, move_str: &str) -> Option<ChessMove> {
    if move_str.len() < 4 {
        return None;
    }
    let bytes = move_str.as_bytes();

    let src_file = bytes[0].wrapping_sub(b'a');
    let src_rank = bytes[1].wrapping_sub(b'1');
    let dst_file = bytes[2].wrapping_sub(b'a');
    let dst_rank = bytes[3].wrapping_sub(b'1');

    if src_file >= 8 || src_rank >= 8 || dst_file >= 8 || dst_rank >= 8 {
        return None;
    }

    let src = Square::make_square(Rank::from_index(src_rank as usize), File::from_index(src_file as usize));
    let dst = Square::make_square(Rank::from_index(dst_rank as usize), File::from_index(dst_file as usize));

    let promo = if move_str.len() >= 5 {
        match bytes[4] {
            b'q' => Some(Piece::Queen),
            b'r' => Some(Piece::Rook),
            b'b' => Some(Piece::Bishop),
            b'n' => Some(Piece::Knight),
            _ => None,
        }
    } else {
        None
    };

    let mv = ChessMove::new(src, dst, promo);
    if board.legal(mv) {
        Some(mv)
    } else {
        None
    }
}

fn parse_setoption(tokens: &[&str], config: &mut EngineConfig, searcher: &mut Searcher) {
    let name_idx = tokens.iter().position(|&t| t == "name");
    let value_idx = tokens.iter().position(|&t| t == "value");

    if let (Some(ni), Some(vi)) = (name_idx, value_idx) {
        let name: String = tokens[ni + 1..vi].join(" ");
        let value: String = tokens[vi + 1..].join(" ");

        match name.to_lowercase().as_str() {
            "hash" => {
                if let Ok(mb) = value.parse::<usize>() {
                    config.hash_mb = mb.clamp(1, 4096);
                    searcher.set_hash_size(config.hash_mb);
                }
            }
            "bookpath" => {
                if value.is_empty() || value == "<empty>" {
                    config.book_path = None;
                    searcher.set_book(Box::new(NoBook));
                } else {
                    match PolyglotBook::from_file(&value) {
                        Ok(book) => {
                            config.book_path = Some(value);
                            searcher.set_book(Box::new(book) as Box<dyn Book>);
                        }
                        Err(_) => {
                            // Bad path: leave the current book (or lack of one) untouched.
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

// search runs in a separate thread with an `Arc<AtomicBool>` stop flag shared w/ main thread.
