pub mod arbitrage;
pub mod csr;
pub mod cycle;
pub mod evaluator;
pub mod path;
pub mod rates;
pub mod solver;
pub mod traits;

pub use arbitrage::{
    ArbitrageEngine, best_conversion, build_graph, build_graph_with_policy, detect_arbitrage,
    detect_arbitrage_global,
};
pub use csr::RateGraph;
pub use rates::{RateSource, RateTable};
pub use solver::{BellmanFordSolver, Relaxation};
