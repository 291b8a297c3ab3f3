//! End-to-end: TOML config and price file on disk, through the walk-forward
//! driver, to artifacts and back.

use std::io::Write;
use std::path::Path;

use arl_runner::artifacts::read_profit_csv;
use arl_runner::metrics::{max_drawdown, segment_stats};
use arl_runner::{load_prices, run, ArtifactManager, LoadOptions, PriceFormat, RunConfig};

const CONFIG: &str = r#"
[engine]
window_size = 6
seed = 11

[engine.search]
samples_per_field = 4
fields = "reduced"

[walk_forward]
train_len = 120
test_len = 40
epochs = 2
update_threshold = 60
reset = "window"
"#;

fn write_ticks(path: &Path, n: usize) {
    let mut f = std::fs::File::create(path).unwrap();
    for i in 0..n {
        let ask = 1.2 + 0.003 * (i as f64 * 0.07).sin() + 0.00001 * i as f64;
        writeln!(f, "20060102 {:06} {:.5}/{:.5}", i, ask, ask + 0.0001).unwrap();
    }
    writeln!(f, "20060103 000000 corrupt").unwrap();
}

#[test]
fn tick_file_to_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let prices_path = dir.path().join("EURUSD.dat");
    let config_path = dir.path().join("arl.toml");
    write_ticks(&prices_path, 300);
    std::fs::write(&config_path, CONFIG).unwrap();

    let config = RunConfig::from_file(&config_path).unwrap();
    let data = load_prices(&prices_path, &LoadOptions::default()).unwrap();
    assert_eq!(data.format, PriceFormat::Dat);
    assert_eq!(data.prices.len(), 300);
    assert_eq!(data.skipped, 1);

    let result = run(&config, &data).unwrap();
    // Folds start at 0, 40, 80, 120, 160; the last one is truncated.
    assert_eq!(result.report.folds.len(), 5);
    assert_eq!(result.summary.ticks, 300 - 120);
    // Two epochs over 119 training ticks, one search every 60 ticks.
    assert!(result.report.folds.iter().all(|f| f.optimizer_rounds == 2));
    for p in result.report.profit.iter() {
        assert!(p.is_finite());
    }
    for s in &result.report.signals {
        assert!([-1.0, 0.0, 1.0].contains(s));
    }

    let out = dir.path().join("runs");
    let paths = ArtifactManager::new(&out).unwrap().save_run(&result).unwrap();
    assert!(paths.run_dir.starts_with(&out));

    let profit = read_profit_csv(&paths.profit_csv).unwrap();
    assert_eq!(profit, result.report.profit);
    let dd = max_drawdown(&profit);
    assert_eq!(dd, result.summary.max_drawdown);
    let segs = segment_stats(&profit, 4);
    assert_eq!(segs.len(), 4);
    assert_eq!(segs.last().map(|s| s.end), Some(profit.len()));
}

#[test]
fn csv_prices_with_named_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    let mut text = String::from("time,bid,mid\n");
    for i in 0..90 {
        let mid = 100.0 + (i as f64 * 0.3).sin();
        text.push_str(&format!("{i},{:.4},{:.4}\n", mid - 0.01, mid));
    }
    std::fs::write(&path, text).unwrap();

    let config = RunConfig::from_toml(
        "[walk_forward]\ntrain_len = 50\ntest_len = 20\nupdate_threshold = 0\n\n[data]\nprice_column = \"mid\"\n",
    )
    .unwrap();
    let opts = LoadOptions {
        format: config.data.format,
        price_column: config.data.price_column.clone(),
    };
    let data = load_prices(&path, &opts).unwrap();
    assert!((data.prices[0] - 100.0).abs() < 1e-9);

    let result = run(&config, &data).unwrap();
    assert_eq!(result.report.folds.len(), 2);
    assert_eq!(result.summary.ticks, 40);
}

#[test]
fn same_config_same_run_id_and_output() {
    let dir = tempfile::tempdir().unwrap();
    let prices_path = dir.path().join("ticks.dat");
    write_ticks(&prices_path, 200);
    let config = RunConfig::from_toml(CONFIG).unwrap();
    let data = load_prices(&prices_path, &LoadOptions::default()).unwrap();

    let a = run(&config, &data).unwrap();
    let b = run(&config, &data).unwrap();
    assert_eq!(a.run_id, b.run_id);
    assert_eq!(a.report.profit, b.report.profit);
    assert_eq!(a.report.final_parameters(), b.report.final_parameters());
}
