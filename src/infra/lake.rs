// ============================================================
// Layer 6 — Data Lake
// ============================================================
// The persisted three-layer lake:
//
//   data/raw/        customers.csv, products.csv, transactions.csv
//   data/stage/      cleaned_*.csv, data_quality_summary.json
//   data/processed/  customer_features.csv, training_data.csv,
//                    X_features.csv, y_target.csv, encoders.json
//
// Tables are CSV via csv + serde; reports and fitted encoders are
// pretty-printed JSON. Deserialization doubles as the schema gate:
// a malformed row fails the whole read with the file and row in the
// error, and the stage refuses to proceed — corrupt data never
// travels further down the pipeline.
//
// training_data.csv and the separated X_features.csv / y_target.csv
// pair are written by hand (header = customer_id + FEATURE_NAMES +
// label, respectively FEATURE_NAMES alone and label alone) because
// their columns are the flattened feature VECTOR, and the vector
// order must match FEATURE_NAMES exactly — hand-writing the headers
// from that same constant makes drift impossible. The train stage
// reads the combined table; the separated pair is the external
// matrix/vector interface, row-aligned with it.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::cleaner::QualityReport;
use crate::data::simulator::SimulatedData;
use crate::domain::entities::{Customer, Product, Transaction};
use crate::domain::features::{
    CustomerFeatures, TrainingExample, FEATURE_NAMES,
};

pub const QUALITY_SUMMARY_FILE: &str = "data_quality_summary.json";
pub const ENCODERS_FILE: &str = "encoders.json";

pub struct DataLake {
    root: PathBuf,
}

impl DataLake {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn stage_dir(&self) -> PathBuf {
        self.root.join("stage")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn encoders_path(&self) -> PathBuf {
        self.processed_dir().join(ENCODERS_FILE)
    }

    // ─── Raw layer ────────────────────────────────────────────────────────────

    pub fn write_raw(&self, data: &SimulatedData) -> Result<()> {
        let dir = self.raw_dir();
        fs::create_dir_all(&dir)?;
        write_table(&dir.join("customers.csv"), &data.customers)?;
        write_table(&dir.join("products.csv"), &data.products)?;
        write_table(&dir.join("transactions.csv"), &data.transactions)?;
        tracing::info!("Raw layer written to '{}'", dir.display());
        Ok(())
    }

    pub fn read_raw(&self) -> Result<SimulatedData> {
        let dir = self.raw_dir();
        Ok(SimulatedData {
            customers: read_table(&dir.join("customers.csv"))?,
            products: read_table(&dir.join("products.csv"))?,
            transactions: read_table(&dir.join("transactions.csv"))?,
        })
    }

    // ─── Stage layer ──────────────────────────────────────────────────────────

    pub fn write_stage(
        &self,
        customers: &[Customer],
        products: &[Product],
        transactions: &[Transaction],
        report: &QualityReport,
    ) -> Result<()> {
        let dir = self.stage_dir();
        fs::create_dir_all(&dir)?;
        write_table(&dir.join("cleaned_customers.csv"), customers)?;
        write_table(&dir.join("cleaned_products.csv"), products)?;
        write_table(&dir.join("cleaned_transactions.csv"), transactions)?;
        let json = serde_json::to_string_pretty(report)?;
        fs::write(dir.join(QUALITY_SUMMARY_FILE), json)?;
        tracing::info!("Stage layer written to '{}'", dir.display());
        Ok(())
    }

    pub fn read_stage(
        &self,
    ) -> Result<(Vec<Customer>, Vec<Product>, Vec<Transaction>)> {
        let dir = self.stage_dir();
        Ok((
            read_table(&dir.join("cleaned_customers.csv"))?,
            read_table(&dir.join("cleaned_products.csv"))?,
            read_table(&dir.join("cleaned_transactions.csv"))?,
        ))
    }

    // ─── Processed layer ──────────────────────────────────────────────────────

    pub fn write_processed(&self, examples: &[TrainingExample]) -> Result<()> {
        let dir = self.processed_dir();
        fs::create_dir_all(&dir)?;

        let feature_rows: Vec<&CustomerFeatures> =
            examples.iter().map(|e| &e.features).collect();
        write_table(&dir.join("customer_features.csv"), &feature_rows)?;

        self.write_training_table(&dir.join("training_data.csv"), examples)?;
        self.write_feature_matrix(&dir.join("X_features.csv"), examples)?;
        self.write_target_vector(&dir.join("y_target.csv"), examples)?;
        tracing::info!(
            "Processed layer written to '{}' ({} customers)",
            dir.display(),
            examples.len()
        );
        Ok(())
    }

    pub fn read_feature_rows(&self) -> Result<Vec<CustomerFeatures>> {
        read_table(&self.processed_dir().join("customer_features.csv"))
    }

    fn write_training_table(
        &self,
        path: &Path,
        examples: &[TrainingExample],
    ) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("cannot create '{}'", path.display()))?;

        let mut header = vec!["customer_id".to_string()];
        header.extend(FEATURE_NAMES.iter().map(|n| n.to_string()));
        header.push("label".to_string());
        writer.write_record(&header)?;

        for example in examples {
            let mut record = vec![example.features.customer_id.to_string()];
            record.extend(example.features.to_vector().iter().map(|x| x.to_string()));
            record.push(example.label.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// The feature matrix alone: FEATURE_NAMES columns, one row per
    /// customer, same row order as training_data.csv.
    fn write_feature_matrix(
        &self,
        path: &Path,
        examples: &[TrainingExample],
    ) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("cannot create '{}'", path.display()))?;
        writer.write_record(FEATURE_NAMES)?;
        for example in examples {
            let record: Vec<String> = example
                .features
                .to_vector()
                .iter()
                .map(|x| x.to_string())
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// The target vector alone, row-aligned with X_features.csv.
    fn write_target_vector(
        &self,
        path: &Path,
        examples: &[TrainingExample],
    ) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("cannot create '{}'", path.display()))?;
        writer.write_record(["label"])?;
        for example in examples {
            writer.write_record([example.label.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_training_table(&self) -> Result<Vec<TrainingExample>> {
        let path = self.processed_dir().join("training_data.csv");
        let mut reader = csv::Reader::from_path(&path).with_context(|| {
            format!(
                "cannot read '{}' — has the features stage run?",
                path.display()
            )
        })?;

        let mut examples = Vec::new();
        for (row_index, record) in reader.records().enumerate() {
            let record = record?;
            let parse = |i: usize| -> Result<f64> {
                record
                    .get(i)
                    .with_context(|| {
                        format!("row {} of training table is too short", row_index + 1)
                    })?
                    .parse::<f64>()
                    .with_context(|| {
                        format!("row {} column {} is not numeric", row_index + 1, i)
                    })
            };

            let customer_id = parse(0)? as u32;
            let values: Vec<f64> = (0..FEATURE_NAMES.len())
                .map(|i| parse(i + 1))
                .collect::<Result<_>>()?;
            let label = parse(FEATURE_NAMES.len() + 1)? as u8;

            examples.push(TrainingExample {
                features: CustomerFeatures::from_vector(customer_id, &values)?,
                label,
            });
        }
        Ok(examples)
    }
}

// ─── Generic CSV helpers ──────────────────────────────────────────────────────

fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create '{}'", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    tracing::debug!("Wrote {} rows to '{}'", rows.len(), path.display());
    Ok(())
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).with_context(|| {
        format!(
            "cannot read '{}' — has the previous stage run?",
            path.display()
        )
    })?;
    let mut rows = Vec::new();
    for (index, row) in reader.deserialize().enumerate() {
        let row: T = row.with_context(|| {
            format!("schema mismatch at row {} of '{}'", index + 1, path.display())
        })?;
        rows.push(row);
    }
    Ok(rows)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cleaner::Cleaner;
    use crate::data::encoder::EncoderSet;
    use crate::data::features::{fit_encoders, FeatureBuilder, FeatureParams};
    use crate::data::simulator::{SimConfig, Simulator};
    use crate::domain::traits::Persistable;
    use chrono::NaiveDate;

    fn simulated() -> SimulatedData {
        Simulator::new(SimConfig {
            customers: 30,
            products: 15,
            transactions: 200,
            noise: 0.1,
            seed: 21,
            ..SimConfig::default()
        })
        .unwrap()
        .run()
    }

    #[test]
    fn test_raw_layer_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let lake = DataLake::new(dir.path());
        let data = simulated();
        lake.write_raw(&data).unwrap();
        let reloaded = lake.read_raw().unwrap();
        assert_eq!(data, reloaded);
    }

    #[test]
    fn test_missing_layer_is_an_explicit_error() {
        let dir = tempfile::tempdir().unwrap();
        let lake = DataLake::new(dir.path());
        let err = lake.read_raw().unwrap_err();
        assert!(err.to_string().contains("previous stage"));
    }

    #[test]
    fn test_training_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let lake = DataLake::new(dir.path());

        let data = simulated();
        let cleaner = Cleaner::new();
        let (customers, _) = cleaner.clean_customers(data.customers);
        let (products, _) = cleaner.clean_products(data.products);
        let (transactions, _) = cleaner.clean_transactions(data.transactions);

        let encoders = fit_encoders(&customers, &transactions);
        let params = FeatureParams {
            as_of: NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
            horizon_days: 30,
        };
        let builder = FeatureBuilder::new(&encoders, &products, params).unwrap();
        let examples = builder.build(&customers, &transactions).unwrap();

        lake.write_processed(&examples).unwrap();
        let reloaded = lake.read_training_table().unwrap();

        assert_eq!(examples.len(), reloaded.len());
        for (a, b) in examples.iter().zip(&reloaded) {
            assert_eq!(a.features.customer_id, b.features.customer_id);
            assert_eq!(a.label, b.label);
            assert_eq!(a.features.to_vector(), b.features.to_vector());
        }

        // The separated matrix/vector pair is row-aligned with the
        // combined table
        let mut x_reader =
            csv::Reader::from_path(lake.processed_dir().join("X_features.csv")).unwrap();
        assert_eq!(
            x_reader.headers().unwrap().iter().collect::<Vec<_>>(),
            FEATURE_NAMES.to_vec()
        );
        let x_rows: Vec<Vec<f64>> = x_reader
            .records()
            .map(|r| {
                r.unwrap()
                    .iter()
                    .map(|v| v.parse::<f64>().unwrap())
                    .collect()
            })
            .collect();
        let mut y_reader =
            csv::Reader::from_path(lake.processed_dir().join("y_target.csv")).unwrap();
        let y_rows: Vec<u8> = y_reader
            .records()
            .map(|r| r.unwrap().get(0).unwrap().parse::<u8>().unwrap())
            .collect();
        assert_eq!(x_rows.len(), examples.len());
        assert_eq!(y_rows.len(), examples.len());
        for ((example, x), y) in examples.iter().zip(&x_rows).zip(&y_rows) {
            assert_eq!(&example.features.to_vector(), x);
            assert_eq!(example.label, *y);
        }

        // Encoders persist next to the features they encoded
        encoders.save(&lake.encoders_path()).unwrap();
        let loaded = EncoderSet::load(&lake.encoders_path()).unwrap();
        assert_eq!(encoders, loaded);
    }
}
