//! Meta-parameter optimizer: the replay cost function and the concurrent
//! stochastic local search built on it.

pub mod objective;
pub mod search;

pub use objective::{cost_function, Objective, ReplayContext};
pub use search::{BestCell, FieldSet, MetaOptimizer, SearchConfig, SearchOutcome};
