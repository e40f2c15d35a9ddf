use std::path::{Path, PathBuf};

use startup_odds::model_store::ModelStore;
use startup_odds::trainer::{Trainer, TrainerOptions};

pub const CSV_HEADER: &str = "founded_year,funding_usd,industry,country,status";

const INDUSTRIES: [&str; 4] = ["IT", "Healthcare", "Retail", "Energy"];
const COUNTRIES: [&str; 3] = ["USA", "India", "Germany"];

/// Synthetic history where funding and industry drive the outcome.
pub fn startup_rows(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let industry = INDUSTRIES[i % INDUSTRIES.len()];
            let country = COUNTRIES[(i / 2) % COUNTRIES.len()];
            let funding = 20_000 + (i * 7_919 % 50) * 100_000;
            let year = 2000 + (i % 20);
            let strong = funding > 2_500_000 || industry == "IT";
            let status = if strong && i % 7 != 0 { "Succeeded" } else { "Failed" };
            format!("{year},{funding},{industry},{country},{status}")
        })
        .collect()
}

/// Write a CSV with `count` good rows plus two malformed ones.
pub fn write_training_csv(dir: &Path, count: usize) -> PathBuf {
    let mut lines = vec![CSV_HEADER.to_string()];
    lines.extend(startup_rows(count));
    lines.push("someday,1000,IT,USA,Succeeded".to_string());
    lines.push("2019,-5,IT,,Failed".to_string());
    let path = dir.join("startup_data.csv");
    std::fs::write(&path, lines.join("\n") + "\n").expect("write training csv");
    path
}

/// Train on the fixture CSV and load the resulting artifact.
pub fn trained_store(dir: &Path) -> ModelStore {
    let data = write_training_csv(dir, 160);
    let artifact = dir.join("models").join("startup_success_model.json");
    Trainer::new(TrainerOptions::default())
        .run(&data, &artifact)
        .expect("train fixture model");
    ModelStore::load(&artifact).expect("load fixture model")
}
