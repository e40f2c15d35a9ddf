use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use startup_odds::dataset::LabeledRecord;
use startup_odds::inference::predict_value;
use startup_odds::ml::ClassifierKind;
use startup_odds::model_store::ModelArtifact;
use startup_odds::schema::FeatureRecord;
use startup_odds::trainer::{TrainerOptions, train_artifact};

const TRAINING_ROWS: usize = 2_000;
const INDUSTRIES: [&str; 6] = ["IT", "Healthcare", "Retail", "Energy", "Finance", "Media"];
const COUNTRIES: [&str; 5] = ["USA", "India", "Germany", "Brazil", "Japan"];

fn training_rows() -> Vec<LabeledRecord> {
    (0..TRAINING_ROWS)
        .map(|i| LabeledRecord {
            line: i + 2,
            record: FeatureRecord {
                founded_year: 1995 + (i % 28) as i32,
                funding_usd: ((i * 7_919) % 97) as f64 * 50_000.0,
                industry: INDUSTRIES[i % INDUSTRIES.len()].to_string(),
                country: COUNTRIES[(i / 3) % COUNTRIES.len()].to_string(),
            },
            succeeded: (i * 31) % 5 < 2,
        })
        .collect()
}

fn artifact(kind: ClassifierKind) -> ModelArtifact {
    let options = TrainerOptions {
        classifier: kind,
        ..TrainerOptions::default()
    };
    train_artifact(&training_rows(), &options, "bench")
        .expect("train bench model")
        .artifact
}

fn request() -> Value {
    json!({"founded_year": 2016, "funding_usd": 1_250_000, "industry": "IT", "country": "Germany"})
}

fn bench_predict(c: &mut Criterion) {
    let body = request();
    for kind in [ClassifierKind::Logreg, ClassifierKind::GbdtStump] {
        let artifact = artifact(kind);
        c.bench_with_input(
            BenchmarkId::new("predict_value", kind),
            &body,
            |b, body| {
                b.iter(|| predict_value(black_box(&artifact), black_box(body)).expect("predict"));
            },
        );
    }
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);
