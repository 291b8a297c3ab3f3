//! Engine: drives the tick pipeline over explicit windows of prices.
//!
//! ```text
//! Idle -> Streaming -> (every update_threshold ticks) Optimizing -> Streaming -> Done
//! ```
//!
//! Ticks are strictly sequential. In train mode each tick updates the weights
//! and, every `update_threshold` ticks, the meta-optimizer replaces the live
//! parameters with the best candidate found on the trailing returns. Test mode
//! freezes both and only measures.

pub mod state;
pub mod tick;

pub use state::{
    directional_accuracy, EngineConfig, EngineError, EnginePhase, EpochReport, Mode,
    MIN_WINDOW_PRICES, MIN_WINDOW_SIZE,
};

use crate::optimizer::MetaOptimizer;
use crate::parameters::Parameters;
use crate::returns::ReturnSeries;
use crate::risk::RiskPolicy;
use crate::rng::RngHierarchy;
use crate::stats::sharpe_estimate;
use crate::weights::Weights;

use tick::{step, TickState};

/// The adaptive trading engine.
pub struct Engine {
    config: EngineConfig,
    policy: Box<dyn RiskPolicy>,
    optimizer: MetaOptimizer,
    state: TickState,
    parameters: Parameters,
    /// Full signal history, starting with the neutral `0.0`.
    signals: Vec<f64>,
    initial_weights: Weights,
    initial_parameters: Parameters,
    phase: EnginePhase,
    /// Optimizer calls made over the engine's lifetime; selects the draw stream.
    rounds: u64,
}

impl Engine {
    /// Engine with weights (and, if unconfigured, parameters) drawn from the seed.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let rng = RngHierarchy::new(config.seed);
        let weights = Weights::random(config.window_size, &mut rng.init_rng("weights"));
        Self::with_weights(config, weights)
    }

    /// Engine starting from a raw coefficient vector, e.g. one restored from disk.
    pub fn with_coefficients(
        config: EngineConfig,
        coefficients: Vec<f64>,
    ) -> Result<Self, EngineError> {
        let weights = Weights::try_from_coefficients(coefficients)
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        Self::with_weights(config, weights)
    }

    /// Engine starting from explicit weights.
    pub fn with_weights(config: EngineConfig, weights: Weights) -> Result<Self, EngineError> {
        config.validate()?;
        if weights.coefficients().len() != config.window_size {
            return Err(EngineError::InvalidConfig(format!(
                "weights have {} coefficients, window_size {} needs {}",
                weights.coefficients().len(),
                config.window_size,
                config.window_size
            )));
        }
        if !weights.is_finite() {
            return Err(EngineError::InvalidConfig("weights must be finite".into()));
        }

        let parameters = match config.initial_parameters {
            Some(p) => p,
            None => {
                let rng = RngHierarchy::new(config.seed);
                Parameters::random(&mut rng.init_rng("parameters"))
            }
        };
        let mut state = TickState::new(weights.clone(), config.return_kind);
        state.profit = config.initial_profit;

        Ok(Self {
            policy: config.risk_policy.build(),
            optimizer: MetaOptimizer::new(config.search),
            state,
            parameters,
            signals: vec![0.0],
            initial_weights: weights,
            initial_parameters: parameters,
            phase: EnginePhase::Idle,
            rounds: 0,
            config,
        })
    }

    /// Replace the live parameters, e.g. with values restored from a previous run.
    pub fn set_parameters(&mut self, parameters: Parameters) -> Result<(), EngineError> {
        parameters.validate()?;
        self.parameters = parameters;
        Ok(())
    }

    /// One training pass over `window`.
    ///
    /// `update_threshold == 0` disables the meta-optimizer. `carried_profit`
    /// seeds the profit series; `None` continues from the engine's own total.
    pub fn train(
        &mut self,
        window: &[f64],
        update_threshold: usize,
        carried_profit: Option<f64>,
    ) -> Result<EpochReport, EngineError> {
        self.run_epoch(Mode::Train, window, update_threshold, carried_profit)
    }

    /// One frozen pass over `window`: no weight or parameter changes.
    pub fn test(
        &mut self,
        window: &[f64],
        carried_profit: Option<f64>,
    ) -> Result<EpochReport, EngineError> {
        self.run_epoch(Mode::Test, window, 0, carried_profit)
    }

    /// Clear the per-window state: weights back to their initial values,
    /// returns and signal history emptied, risk state and position neutral.
    /// Parameters and the running profit persist.
    pub fn reset(&mut self) {
        let profit = self.state.profit;
        self.state = TickState::new(self.initial_weights.clone(), self.config.return_kind);
        self.state.profit = profit;
        self.signals = vec![0.0];
        self.phase = EnginePhase::Idle;
        tracing::debug!(parameters = %self.parameters, "engine reset");
    }

    /// [`reset`](Self::reset) and also discard the optimized parameters.
    pub fn reset_all(&mut self) {
        self.reset();
        self.parameters = self.initial_parameters;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn weights(&self) -> &Weights {
        &self.state.weights
    }

    pub fn returns(&self) -> &ReturnSeries {
        &self.state.returns
    }

    pub fn signals(&self) -> &[f64] {
        &self.signals
    }

    pub fn profit(&self) -> f64 {
        self.state.profit
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn optimizer_rounds(&self) -> u64 {
        self.rounds
    }

    fn run_epoch(
        &mut self,
        mode: Mode,
        window: &[f64],
        update_threshold: usize,
        carried_profit: Option<f64>,
    ) -> Result<EpochReport, EngineError> {
        validate_window(window)?;

        let learn = mode == Mode::Train;
        if let Some(p) = carried_profit {
            self.state.profit = p;
        }
        let start_signal = self.state.last_signal;
        let start_fallbacks = self.state.weights.fallback_count();
        self.state
            .risk
            .anchor(self.state.profit, window[0], start_signal);
        self.phase = EnginePhase::Streaming;

        let ticks = window.len() - 1;
        let mut report = EpochReport {
            mode,
            profit: Vec::with_capacity(window.len()),
            signals: Vec::with_capacity(window.len()),
            raw_signals: Vec::with_capacity(ticks),
            returns: Vec::with_capacity(ticks),
            rewards: Vec::with_capacity(ticks),
            sharpe: 0.0,
            directional_accuracy: None,
            optimizer_rounds: 0,
            improved_rounds: 0,
            fallbacks: 0,
            parameters: self.parameters,
        };
        report.profit.push(self.state.profit);
        report.signals.push(start_signal);

        for (i, pair) in window.windows(2).enumerate() {
            let r = self.state.returns.push_prices(pair[0], pair[1]);
            let tick = step(
                &mut self.state,
                r,
                pair[1],
                &self.parameters,
                self.policy.as_ref(),
                self.config.window_size,
                learn,
            );
            self.signals.push(tick.signal);

            report.returns.push(r);
            report.raw_signals.push(tick.raw_signal);
            report.signals.push(tick.signal);
            report.rewards.push(tick.reward);
            report.profit.push(tick.profit);

            if learn && update_threshold > 0 && (i + 1) % update_threshold == 0 {
                report.optimizer_rounds += 1;
                let trailing = &window[i + 1 - update_threshold..=i + 1];
                if self.optimize(trailing) {
                    report.improved_rounds += 1;
                }
            }
        }

        report.sharpe = sharpe_estimate(&report.rewards);
        report.directional_accuracy =
            directional_accuracy(&report.signals[..ticks], &report.returns);
        report.parameters = self.parameters;
        report.fallbacks = self.state.weights.fallback_count().saturating_sub(start_fallbacks);
        self.phase = EnginePhase::Done;

        if report.fallbacks > 0 {
            tracing::warn!(
                mode = ?mode,
                ticks,
                fallbacks = report.fallbacks,
                total = self.state.weights.fallback_count(),
                "weight update guards engaged"
            );
        }
        tracing::debug!(
            mode = ?mode,
            ticks,
            profit = report.final_profit(),
            sharpe = report.sharpe,
            optimizer_rounds = report.optimizer_rounds,
            improved_rounds = report.improved_rounds,
            fallbacks = report.fallbacks,
            "epoch complete"
        );
        Ok(report)
    }

    /// Run one search replaying `prices`; true if parameters changed.
    fn optimize(&mut self, prices: &[f64]) -> bool {
        self.phase = EnginePhase::Optimizing;
        let outcome = self.optimizer.search(
            &self.parameters,
            &self.state.weights,
            prices,
            self.config.window_size,
            self.config.return_kind,
            self.policy.as_ref(),
            self.rounds,
        );
        self.rounds += 1;
        self.parameters = outcome.parameters;
        self.phase = EnginePhase::Streaming;
        outcome.improved
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("policy", &self.policy.name())
            .field("parameters", &self.parameters)
            .field("weights", &self.state.weights)
            .field("profit", &self.state.profit)
            .field("phase", &self.phase)
            .field("rounds", &self.rounds)
            .finish()
    }
}

fn validate_window(window: &[f64]) -> Result<(), EngineError> {
    if window.len() < MIN_WINDOW_PRICES {
        return Err(EngineError::InvalidWindow {
            len: window.len(),
            min: MIN_WINDOW_PRICES,
        });
    }
    if let Some((index, &value)) = window.iter().enumerate().find(|(_, p)| !p.is_finite()) {
        return Err(EngineError::NonFinitePrice { index, value });
    }
    Ok(())
}
