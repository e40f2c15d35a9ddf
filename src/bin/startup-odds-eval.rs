//! Developer utility to score a model artifact against a labeled dataset.

use std::path::PathBuf;

use startup_odds::dataset::{self, load_table};
use startup_odds::inference::predict_record;
use startup_odds::ml::metrics::{DECISION_THRESHOLD, binary_confusion, summarize};
use startup_odds::model_store::ModelStore;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    model_path: PathBuf,
    data_path: PathBuf,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let store = ModelStore::load(&options.model_path).map_err(|err| err.to_string())?;
    let artifact = store.current();
    let table = load_table(&options.data_path).map_err(|err| err.to_string())?;
    let validated = dataset::validate_rows(&table.rows);

    let mut scores = Vec::with_capacity(validated.rows.len());
    let mut labels = Vec::with_capacity(validated.rows.len());
    let mut unseen_rows = 0usize;
    let mut failed = 0usize;
    for row in &validated.rows {
        match predict_record(artifact, &row.record) {
            Ok(prediction) => {
                if !prediction.unseen_fields.is_empty() {
                    unseen_rows += 1;
                }
                scores.push(prediction.success_probability);
                labels.push(row.succeeded);
            }
            Err(err) => {
                failed += 1;
                eprintln!("line {}: {err}", row.line);
            }
        }
    }

    println!("model_id: {}", artifact.model_id);
    println!("classifier: {}", artifact.classifier.kind());
    println!(
        "rows: read={} scored={} skipped={} failed={}",
        table.rows.len(),
        scores.len(),
        validated.skipped.len(),
        failed
    );
    if scores.is_empty() {
        return Err("No rows could be scored".to_string());
    }
    let metrics = summarize(&scores, &labels);
    match metrics.roc_auc {
        Some(auc) => println!("roc_auc: {auc:.4}"),
        None => println!("roc_auc: n/a (single outcome)"),
    }
    println!(
        "accuracy@{DECISION_THRESHOLD}: {:.4}  log_loss: {:.4}  brier: {:.4}",
        metrics.accuracy.unwrap_or(0.0),
        metrics.log_loss.unwrap_or(0.0),
        metrics.brier.unwrap_or(0.0)
    );
    println!(
        "precision: {:.3}  recall: {:.3}",
        metrics.precision.unwrap_or(0.0),
        metrics.recall.unwrap_or(0.0)
    );
    let cm = binary_confusion(&scores, &labels, DECISION_THRESHOLD);
    println!("confusion matrix (rows=true, cols=pred; 0=failed, 1=succeeded):");
    for truth in 0..cm.n_classes {
        let mut row = String::new();
        for pred in 0..cm.n_classes {
            row.push_str(&format!("{:6}", cm.get(truth, pred)));
        }
        println!("{row}");
    }
    println!(
        "unseen category rate: {:.3}",
        unseen_rows as f32 / scores.len() as f32
    );
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut model_path: Option<PathBuf> = None;
    let mut data_path: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model_path = Some(PathBuf::from(value));
            }
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                data_path = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let model_path = model_path.ok_or_else(|| "--model is required".to_string())?;
    let data_path = data_path.ok_or_else(|| "--data is required".to_string())?;
    Ok(CliOptions {
        model_path,
        data_path,
    })
}

fn help_text() -> String {
    [
        "startup-odds-eval",
        "",
        "Usage:",
        "  startup-odds-eval --model <model.json> --data <file.csv|.jsonl|.json>",
    ]
    .join("\n")
}
