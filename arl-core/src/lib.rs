//! ARL Core: adaptive recurrent reinforcement-learning trading signal.
//!
//! This crate contains the algorithmic core, with no file I/O:
//! - Return series over raw prices
//! - Recurrent signal function and its online weight update
//! - Risk overlay policies (drawdown stop, price stop)
//! - Meta-parameters and the concurrent stochastic search that tunes them
//! - The engine that drives train/test passes over price windows

pub mod engine;
pub mod optimizer;
pub mod parameters;
pub mod returns;
pub mod risk;
pub mod rng;
pub mod signal;
pub mod stats;
pub mod weights;

pub use engine::{Engine, EngineConfig, EngineError, EnginePhase, EpochReport, Mode};
pub use optimizer::{FieldSet, MetaOptimizer, Objective, SearchConfig, SearchOutcome};
pub use parameters::{ParameterError, ParameterField, Parameters};
pub use returns::{ReturnKind, ReturnSeries};
pub use risk::{DrawdownStop, PriceStop, RiskPolicy, RiskPolicyConfig, RiskState};
pub use rng::RngHierarchy;
pub use weights::{Weights, WeightsError};
