//! Stochastic local search over the meta-parameters.
//!
//! Fields are visited in order. For each field, `samples_per_field` candidates
//! are drawn from a normal distribution centred on the current best value with
//! a standard deviation of `spread * |value| + floor`. The trials of a field
//! are scored in parallel; each one offers its score to a single mutex-guarded
//! [`BestCell`], which replaces the incumbent only on strict improvement.
//!
//! Every trial draws from its own RNG derived from `(round, field, sample)`,
//! and ties between candidates are broken by trial ordinal, so the outcome is
//! identical whether trials run in parallel or sequentially.

use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

use crate::parameters::{ParameterField, Parameters};
use crate::returns::ReturnKind;
use crate::risk::RiskPolicy;
use crate::rng::RngHierarchy;
use crate::weights::Weights;

use super::objective::{cost_function, Objective, ReplayContext};

/// Which parameters the search perturbs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSet {
    /// All five parameters.
    #[default]
    All,
    /// Only the risk thresholds `x` and `y`.
    Reduced,
}

impl FieldSet {
    pub fn fields(self) -> &'static [ParameterField] {
        match self {
            FieldSet::All => &ParameterField::ALL,
            FieldSet::Reduced => &ParameterField::REDUCED,
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub samples_per_field: usize,
    /// Standard deviation as a fraction of the current value.
    pub spread: f64,
    /// Minimum standard deviation.
    pub floor: f64,
    pub fields: FieldSet,
    pub objective: Objective,
    /// Master seed of the trial RNG hierarchy.
    pub seed: u64,
    /// Score trials on the rayon pool (same result either way).
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            samples_per_field: 15,
            spread: 0.5,
            floor: 1e-4,
            fields: FieldSet::All,
            objective: Objective::default(),
            seed: 42,
            parallel: true,
        }
    }
}

/// Result of one search round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub parameters: Parameters,
    pub score: f64,
    pub basis_score: f64,
    /// False when no trial beat the basis; `parameters` is then the basis.
    pub improved: bool,
    pub trials: usize,
}

/// Best-so-far register shared by concurrent trials.
#[derive(Debug, Clone, Copy)]
pub struct BestCell {
    parameters: Parameters,
    score: f64,
    /// Ordinal of the trial that produced the incumbent; `None` for the basis.
    origin: Option<usize>,
}

impl BestCell {
    pub fn new(parameters: Parameters, score: f64) -> Self {
        Self {
            parameters,
            score,
            origin: None,
        }
    }

    /// Compare-and-replace. A higher score always wins; an equal score wins
    /// only against another trial with a larger ordinal, never the basis.
    pub fn offer(&mut self, parameters: Parameters, score: f64, ordinal: usize) -> bool {
        let wins = score > self.score
            || (score == self.score && self.origin.is_some_and(|o| ordinal < o));
        if wins {
            self.parameters = parameters;
            self.score = score;
            self.origin = Some(ordinal);
        }
        wins
    }

    pub fn parameters(&self) -> Parameters {
        self.parameters
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn improved(&self) -> bool {
        self.origin.is_some()
    }
}

/// Meta-parameter optimizer.
#[derive(Debug, Clone)]
pub struct MetaOptimizer {
    config: SearchConfig,
    rng: RngHierarchy,
}

impl MetaOptimizer {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            rng: RngHierarchy::new(config.seed),
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search around `basis`, scoring candidates by replaying `prices`.
    ///
    /// `round` selects an independent stream of draws; the engine passes its
    /// optimizer-call counter. Blocks until every trial has completed.
    #[allow(clippy::too_many_arguments)]
    pub fn search(
        &self,
        basis: &Parameters,
        weights: &Weights,
        prices: &[f64],
        window_size: usize,
        return_kind: ReturnKind,
        policy: &dyn RiskPolicy,
        round: u64,
    ) -> SearchOutcome {
        let ctx = ReplayContext {
            window_size,
            return_kind,
            policy,
            objective: self.config.objective,
        };
        let basis_score = cost_function(basis, weights, prices, &ctx);
        let cell = Mutex::new(BestCell::new(*basis, basis_score));
        let samples = self.config.samples_per_field;

        for (field_index, &field) in self.config.fields.fields().iter().enumerate() {
            let center = lock(&cell).parameters();

            let trial = |sample: usize| {
                let Some(candidate) = self.perturb(&center, field, round, sample) else {
                    return;
                };
                let score = cost_function(&candidate, weights, prices, &ctx);
                lock(&cell).offer(candidate, score, field_index * samples + sample);
            };

            if self.config.parallel {
                (0..samples).into_par_iter().for_each(trial);
            } else {
                (0..samples).for_each(trial);
            }
        }

        let best = *lock(&cell);
        let outcome = SearchOutcome {
            parameters: best.parameters(),
            score: best.score(),
            basis_score,
            improved: best.improved(),
            trials: samples * self.config.fields.fields().len(),
        };

        if outcome.improved {
            tracing::debug!(
                round,
                basis_score,
                score = outcome.score,
                parameters = %outcome.parameters,
                "meta-parameters improved"
            );
        } else {
            tracing::debug!(round, basis_score, "no meta-parameter improvement");
        }
        outcome
    }

    /// Candidate with `field` drawn around its value in `center`; clamped at 0.
    fn perturb(
        &self,
        center: &Parameters,
        field: ParameterField,
        round: u64,
        sample: usize,
    ) -> Option<Parameters> {
        let value = center.get(field);
        let std_dev = self.config.spread * value.abs() + self.config.floor;
        let normal = Normal::new(value, std_dev).ok()?;
        let mut rng = self.rng.rng_for(round, field.name(), sample as u64);
        let drawn = normal.sample(&mut rng).max(0.0);
        center.with(field, drawn).ok()
    }
}

fn lock(cell: &Mutex<BestCell>) -> std::sync::MutexGuard<'_, BestCell> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}
