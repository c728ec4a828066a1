use std::str::FromStr;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use gambit::board::{Board, MoveGen};
use gambit::game::Game;
use gambit::search::Searcher;

fn bench_search(c: &mut Criterion) {
    gambit::board::init();
    let board = Board::default();

    c.bench_function("search_depth_3_startpos", |b| {
        b.iter(|| {
            let game = Game::new(board);
            let mut searcher = Searcher::new();
            searcher.find_move(&game, 3, Duration::from_secs(60))
        })
    });

    let kiwipete =
        Board::from_str("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();

    c.bench_function("search_depth_3_kiwipete", |b| {
        b.iter(|| {
            let game = Game::new(kiwipete);
            let mut searcher = Searcher::new();
            searcher.find_move(&game, 3, Duration::from_secs(60))
        })
    });

    c.bench_function("search_depth_4_startpos", |b| {
        b.iter(|| {
            let game = Game::new(board);
            let mut searcher = Searcher::new();
            searcher.find_move(&game, 4, Duration::from_secs(60))
        })
    });
}

fn bench_movegen(c: &mut Criterion) {
    gambit::board::init();
    let board = Board::default();
    c.bench_function("movegen_startpos", |b| {
        b.iter(|| {
            let moves: Vec<_> = MoveGen::new_legal(&board).collect();
            moves.len()
        })
    });

    let kiwipete =
        Board::from_str("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
    c.bench_function("movegen_kiwipete", |b| {
        b.iter(|| {
            let moves: Vec<_> = MoveGen::new_legal(&kiwipete).collect();
            moves.len()
        })
    });
}

criterion_group!(benches, bench_search, bench_movegen);
criterion_main!(benches);
