//! Print the program environment, optionally modified.

use ringctx::Ring;

fn main() {
    ringenv::logging::init();
    let ring = Ring::builder().build();
    std::process::exit(ringenv::run(&ring));
}
