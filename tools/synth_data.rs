//! Synthetic Dataset Generator
//!
//! Writes a labelled raw dataset plus reference/current feature batches for
//! exercising training, batch prediction and drift detection locally.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "synth-data", about = "Generate synthetic credit card transactions")]
struct Args {
    /// Root directory for generated files
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,

    /// Rows in each generated file
    #[arg(long, default_value_t = 1000)]
    rows: usize,

    /// Fraction of fraudulent rows in the labelled dataset
    #[arg(long, default_value_t = 0.05)]
    fraud_rate: f64,

    /// Mean shift applied to V1 in the current batch
    #[arg(long, default_value_t = 0.0)]
    shift: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// One generated transaction
#[derive(Debug, Clone)]
struct Transaction {
    id: u64,
    time: f64,
    v: [f64; 4],
    amount: f64,
    merchant_category: &'static str,
    class: u8,
}

/// Transaction generator with a fixed seed
struct TransactionGenerator {
    rng: StdRng,
    standard: Normal<f64>,
    transaction_counter: u64,
}

impl TransactionGenerator {
    fn new(seed: u64) -> Result<Self> {
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            standard: Normal::new(0.0, 1.0).context("invalid normal distribution")?,
            transaction_counter: 0,
        })
    }

    fn gaussian(&mut self, mean: f64, sd: f64) -> f64 {
        mean + sd * self.standard.sample(&mut self.rng)
    }

    /// Generate a legitimate transaction; `shift` moves the V1 mean.
    fn generate_legitimate(&mut self, shift: f64) -> Transaction {
        self.transaction_counter += 1;
        Transaction {
            id: self.transaction_counter,
            time: self.rng.gen_range(0.0..172_800.0),
            v: [
                self.gaussian(shift, 1.0),
                self.gaussian(0.0, 1.0),
                self.gaussian(0.5, 1.0),
                self.gaussian(0.0, 1.0),
            ],
            amount: self.rng.gen_range(1.0..300.0),
            merchant_category: self.random_choice(&["grocery", "restaurant", "fuel", "online"]),
            class: 0,
        }
    }

    /// Generate a fraudulent transaction
    fn generate_suspicious(&mut self, shift: f64) -> Transaction {
        self.transaction_counter += 1;
        Transaction {
            id: self.transaction_counter,
            time: self.rng.gen_range(0.0..21_600.0), // Night time
            v: [
                self.gaussian(shift - 3.0, 1.5),
                self.gaussian(2.5, 1.0),
                self.gaussian(-4.0, 1.5),
                self.gaussian(3.0, 1.0),
            ],
            amount: self.rng.gen_range(500.0..5000.0), // High amount
            merchant_category: self.random_choice(&["online", "electronics"]),
            class: 1,
        }
    }

    fn generate(&mut self, fraud_rate: f64, shift: f64) -> Transaction {
        if self.rng.gen_bool(fraud_rate) {
            self.generate_suspicious(shift)
        } else {
            self.generate_legitimate(shift)
        }
    }

    fn random_choice(&mut self, choices: &[&'static str]) -> &'static str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

/// Output layout of a generated file
#[derive(Debug, Clone, Copy)]
enum Layout {
    /// `id`, numeric features, `Class`
    Labelled,
    /// Numeric features plus `merchant_category`, no label
    DriftFeatures,
    /// Numeric features only
    ModelInput,
}

impl Layout {
    fn header(&self) -> Vec<&'static str> {
        let mut header = Vec::new();
        if let Layout::Labelled = self {
            header.push("id");
        }
        header.extend(["Time", "V1", "V2", "V3", "V4", "Amount"]);
        match self {
            Layout::Labelled => header.push("Class"),
            Layout::DriftFeatures => header.push("merchant_category"),
            Layout::ModelInput => {}
        }
        header
    }

    fn record(&self, tx: &Transaction) -> Vec<String> {
        let mut record = Vec::new();
        if let Layout::Labelled = self {
            record.push(tx.id.to_string());
        }
        record.push(format!("{:.0}", tx.time));
        record.extend(tx.v.iter().map(|v| format!("{:.6}", v)));
        record.push(format!("{:.2}", tx.amount));
        match self {
            Layout::Labelled => record.push(tx.class.to_string()),
            Layout::DriftFeatures => record.push(tx.merchant_category.to_string()),
            Layout::ModelInput => {}
        }
        record
    }
}

fn write_rows(path: &Path, layout: Layout, rows: &[Transaction]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(layout.header())?;
    for tx in rows {
        writer.write_record(layout.record(tx))?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), ?layout, "File written");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "synth_data=info".into()),
        )
        .init();

    let args = Args::parse();
    anyhow::ensure!(
        (0.0..=1.0).contains(&args.fraud_rate),
        "fraud rate must be within [0, 1]"
    );

    info!(
        output_dir = %args.output_dir.display(),
        rows = args.rows,
        fraud_rate = args.fraud_rate,
        shift = args.shift,
        seed = args.seed,
        "Starting synthetic data generation"
    );

    let mut generator = TransactionGenerator::new(args.seed)?;

    let labelled: Vec<Transaction> = (0..args.rows)
        .map(|_| generator.generate(args.fraud_rate, 0.0))
        .collect();
    let frauds = labelled.iter().filter(|tx| tx.class == 1).count();

    write_rows(
        &args.output_dir.join("raw/creditcard.csv"),
        Layout::Labelled,
        &labelled,
    )?;
    write_rows(
        &args.output_dir.join("processed/train_features.csv"),
        Layout::DriftFeatures,
        &labelled,
    )?;

    let current: Vec<Transaction> = (0..args.rows)
        .map(|_| generator.generate(args.fraud_rate, args.shift))
        .collect();
    write_rows(
        &args.output_dir.join("raw/production_features_batch.csv"),
        Layout::DriftFeatures,
        &current,
    )?;
    write_rows(
        &args.output_dir.join("raw/new_transactions.csv"),
        Layout::ModelInput,
        &current,
    )?;

    info!(
        labelled = labelled.len(),
        frauds,
        current = current.len(),
        "Completed synthetic data generation"
    );
    Ok(())
}
