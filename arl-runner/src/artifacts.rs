//! Artifact export for completed runs.
//!
//! Each run gets its own directory under the output root, named by run id:
//! - `signals.csv`: tick, position held, signal
//! - `profit.csv`: tick, cumulative profit (tick 0 is the starting value)
//! - `weights.csv`: one coefficient row per fold
//! - `parameters.csv`: one parameter row per fold
//! - `manifest.json`: run id, config, final state, summary, provenance

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arl_core::parameters::Parameters;

use crate::config::RunConfig;
use crate::metrics::PerformanceSummary;
use crate::runner::RunResult;
use crate::walk_forward::FoldResult;

/// Summary written as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    pub source: String,
    pub dataset_hash: String,
    pub config: RunConfig,
    pub folds: usize,
    pub final_parameters: Option<Parameters>,
    pub final_weights: Vec<f64>,
    pub summary: PerformanceSummary,
}

impl RunManifest {
    pub fn from_result(result: &RunResult) -> Self {
        Self {
            run_id: result.run_id.clone(),
            timestamp: result.metadata.timestamp,
            duration_secs: result.metadata.duration_secs,
            source: result.metadata.source.clone(),
            dataset_hash: result.metadata.dataset_hash.clone(),
            config: result.config.clone(),
            folds: result.report.folds.len(),
            final_parameters: result.report.final_parameters(),
            final_weights: result.final_weights().to_vec(),
            summary: result.summary.clone(),
        }
    }
}

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub manifest: PathBuf,
    pub signals_csv: PathBuf,
    pub profit_csv: PathBuf,
    pub weights_csv: PathBuf,
    pub parameters_csv: PathBuf,
}

/// Writes all artifacts for a run.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("failed to create output directory {}", output_dir.display())
        })?;
        Ok(Self { output_dir })
    }

    pub fn save_run(&self, result: &RunResult) -> Result<ArtifactPaths> {
        let run_dir = self.output_dir.join(&result.run_id);
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("failed to create run directory {}", run_dir.display()))?;

        let paths = ArtifactPaths {
            manifest: run_dir.join("manifest.json"),
            signals_csv: run_dir.join("signals.csv"),
            profit_csv: run_dir.join("profit.csv"),
            weights_csv: run_dir.join("weights.csv"),
            parameters_csv: run_dir.join("parameters.csv"),
            run_dir,
        };

        let report = &result.report;
        write_signals_csv(&paths.signals_csv, &report.positions, &report.signals)?;
        write_profit_csv(&paths.profit_csv, &report.profit)?;
        write_weights_csv(&paths.weights_csv, &report.folds)?;
        write_parameters_csv(&paths.parameters_csv, &report.folds)?;
        write_manifest(&paths.manifest, &RunManifest::from_result(result))?;

        tracing::info!(dir = %paths.run_dir.display(), "artifacts written");
        Ok(paths)
    }
}

// ─── CSV writers ────────────────────────────────────────────────────

fn create(path: &Path) -> Result<csv::Writer<File>> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(csv::Writer::from_writer(file))
}

pub fn write_signals_csv(path: &Path, positions: &[f64], signals: &[f64]) -> Result<()> {
    let mut wtr = create(path)?;
    wtr.write_record(["tick", "position", "signal"])?;
    for (tick, (held, signal)) in positions.iter().zip(signals).enumerate() {
        wtr.write_record([(tick + 1).to_string(), held.to_string(), signal.to_string()])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_profit_csv(path: &Path, profit: &[f64]) -> Result<()> {
    let mut wtr = create(path)?;
    wtr.write_record(["tick", "profit"])?;
    for (tick, p) in profit.iter().enumerate() {
        wtr.write_record([tick.to_string(), p.to_string()])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Weight vectors have the same length in every fold; columns are `w0..wN`.
pub fn write_weights_csv(path: &Path, folds: &[FoldResult]) -> Result<()> {
    let mut wtr = create(path)?;
    let width = folds.first().map_or(0, |f| f.weights.len());
    let mut header = vec!["fold".to_string()];
    header.extend((0..width).map(|i| format!("w{i}")));
    wtr.write_record(&header)?;
    for fold in folds {
        let mut row = vec![fold.spec.fold_index.to_string()];
        row.extend(fold.weights.iter().map(f64::to_string));
        wtr.write_record(&row)?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_parameters_csv(path: &Path, folds: &[FoldResult]) -> Result<()> {
    let mut wtr = create(path)?;
    wtr.write_record([
        "fold",
        "delta",
        "eta",
        "rho",
        "x",
        "y",
        "test_profit",
        "test_sharpe",
    ])?;
    for fold in folds {
        let p = &fold.parameters;
        wtr.write_record([
            fold.spec.fold_index.to_string(),
            p.delta().to_string(),
            p.eta().to_string(),
            p.rho().to_string(),
            p.x().to_string(),
            p.y().to_string(),
            fold.test_profit.to_string(),
            fold.test_sharpe.to_string(),
        ])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    let json =
        serde_json::to_string_pretty(manifest).context("failed to serialize run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write manifest to {}", path.display()))?;
    Ok(())
}

// ─── Readers ────────────────────────────────────────────────────────

/// Read the `profit` column of a profit CSV.
pub fn read_profit_csv(path: &Path) -> Result<Vec<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let headers = rdr.headers()?.clone();
    let Some(index) = headers.iter().position(|h| h == "profit") else {
        bail!("{} has no profit column", path.display());
    };

    let mut profit = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("bad row {} in {}", row + 2, path.display()))?;
        let value = record.get(index).unwrap_or_default();
        let p: f64 = value
            .parse()
            .with_context(|| format!("bad profit '{value}' on row {}", row + 2))?;
        profit.push(p);
    }
    Ok(profit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::{LoadedPrices, PriceFormat};
    use crate::runner::run;
    use crate::walk_forward::WalkForwardConfig;

    fn small_result() -> RunResult {
        let config = RunConfig {
            walk_forward: WalkForwardConfig {
                train_len: 40,
                test_len: 20,
                update_threshold: 0,
                ..WalkForwardConfig::default()
            },
            ..RunConfig::default()
        };
        let data = LoadedPrices {
            prices: (0..100).map(|i| 2.0 + 0.01 * (i as f64 * 0.2).sin()).collect(),
            skipped: 0,
            format: PriceFormat::Csv,
            source: PathBuf::from("sine.csv"),
            dataset_hash: "hash".into(),
        };
        run(&config, &data).unwrap()
    }

    #[test]
    fn save_run_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let result = small_result();
        let paths = ArtifactManager::new(dir.path()).unwrap().save_run(&result).unwrap();

        assert!(paths.run_dir.ends_with(&result.run_id));
        for p in [
            &paths.manifest,
            &paths.signals_csv,
            &paths.profit_csv,
            &paths.weights_csv,
            &paths.parameters_csv,
        ] {
            assert!(p.exists(), "{} missing", p.display());
        }

        let weights = std::fs::read_to_string(&paths.weights_csv).unwrap();
        let lines: Vec<_> = weights.lines().collect();
        assert_eq!(lines.len(), 1 + result.report.folds.len());
        assert!(lines[0].starts_with("fold,w0,w1"));
    }

    #[test]
    fn profit_csv_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let result = small_result();
        let paths = ArtifactManager::new(dir.path()).unwrap().save_run(&result).unwrap();
        let profit = read_profit_csv(&paths.profit_csv).unwrap();
        assert_eq!(profit, result.report.profit);
    }

    #[test]
    fn manifest_is_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let result = small_result();
        let paths = ArtifactManager::new(dir.path()).unwrap().save_run(&result).unwrap();
        let text = std::fs::read_to_string(&paths.manifest).unwrap();
        let manifest: RunManifest = serde_json::from_str(&text).unwrap();
        assert_eq!(manifest.run_id, result.run_id);
        assert_eq!(manifest.folds, result.report.folds.len());
        assert_eq!(manifest.final_weights.len(), 13);
        assert_eq!(manifest.config.engine.window_size, 13);
    }

    #[test]
    fn profit_csv_without_profit_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "tick,value\n0,1.0\n").unwrap();
        assert!(read_profit_csv(&path).is_err());
    }
}
