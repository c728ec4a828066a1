fn main() {
    gambit::board::init();
    gambit::uci::run();
}
