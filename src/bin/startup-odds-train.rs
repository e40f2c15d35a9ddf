//! Train a success model from historical records and write the artifact.

use std::path::PathBuf;

use startup_odds::config::ServiceConfig;
use startup_odds::logging;
use startup_odds::ml::ClassifierKind;
use startup_odds::trainer::{TrainReport, Trainer};

fn main() {
    if let Err(err) = logging::init("train") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct CliOptions {
    data: Option<PathBuf>,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
    classifier: Option<ClassifierKind>,
    epochs: Option<usize>,
    learning_rate: Option<f32>,
    l2: Option<f32>,
    batch_size: Option<usize>,
    seed: Option<u64>,
    validation_fraction: Option<f64>,
    rounds: Option<usize>,
    gbdt_learning_rate: Option<f32>,
    gbdt_l2: Option<f32>,
    bins: Option<usize>,
    balance_classes: bool,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let data = options
        .data
        .clone()
        .ok_or_else(|| format!("--data is required\n\n{}", help_text()))?;
    let mut config = ServiceConfig::load(options.config.as_deref()).map_err(|err| err.to_string())?;
    apply_overrides(&mut config, &options);
    config.validate().map_err(|err| err.to_string())?;

    let out = match options.out {
        Some(path) => path,
        None => config.artifact_path().map_err(|err| err.to_string())?,
    };
    let trainer = Trainer::new(config.training.trainer_options());
    let report = trainer.run(&data, &out).map_err(|err| err.to_string())?;
    print_report(&report);
    Ok(())
}

fn apply_overrides(config: &mut ServiceConfig, options: &CliOptions) {
    let training = &mut config.training;
    if let Some(kind) = options.classifier {
        training.classifier = kind;
    }
    if let Some(epochs) = options.epochs {
        training.epochs = epochs;
    }
    if let Some(lr) = options.learning_rate {
        training.learning_rate = lr;
    }
    if let Some(l2) = options.l2 {
        training.l2 = l2;
    }
    if let Some(batch_size) = options.batch_size {
        training.batch_size = batch_size;
    }
    if let Some(seed) = options.seed {
        training.seed = seed;
    }
    if let Some(fraction) = options.validation_fraction {
        training.validation_fraction = fraction;
    }
    if let Some(rounds) = options.rounds {
        training.rounds = rounds;
    }
    if let Some(lr) = options.gbdt_learning_rate {
        training.gbdt_learning_rate = lr;
    }
    if let Some(l2) = options.gbdt_l2 {
        training.gbdt_l2 = l2;
    }
    if let Some(bins) = options.bins {
        training.bins = bins;
    }
    if options.balance_classes {
        training.balance_classes = true;
    }
}

fn print_report(report: &TrainReport) {
    println!("model_id: {}", report.model_id);
    println!("classifier: {}", report.classifier);
    println!("artifact: {}", report.artifact_path.display());
    println!("data fingerprint: {}", report.fingerprint);
    println!(
        "rows: read={} used={} skipped={} (train={} validation={})",
        report.rows_read,
        report.rows_used,
        report.rows_skipped(),
        report.train_rows,
        report.validation_rows
    );
    for skip in report.skipped.iter().take(10) {
        println!("  skipped line {}: {}", skip.line, skip.reason);
    }
    let metrics = &report.metrics;
    match metrics.roc_auc {
        Some(auc) => println!("validation roc_auc: {auc:.4}"),
        None => println!("validation roc_auc: n/a"),
    }
    if let (Some(acc), Some(loss), Some(brier)) = (metrics.accuracy, metrics.log_loss, metrics.brier) {
        println!("validation accuracy: {acc:.4}  log_loss: {loss:.4}  brier: {brier:.4}");
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Err(help_text()),
            "--balance-classes" => options.balance_classes = true,
            "--data" => options.data = Some(PathBuf::from(take_value(&args, &mut idx, flag)?)),
            "--out" => options.out = Some(PathBuf::from(take_value(&args, &mut idx, flag)?)),
            "--config" => options.config = Some(PathBuf::from(take_value(&args, &mut idx, flag)?)),
            "--classifier" => {
                options.classifier = Some(take_value(&args, &mut idx, flag)?.parse()?);
            }
            "--epochs" => options.epochs = Some(parse_number(&args, &mut idx, flag)?),
            "--learning-rate" => options.learning_rate = Some(parse_number(&args, &mut idx, flag)?),
            "--l2" => options.l2 = Some(parse_number(&args, &mut idx, flag)?),
            "--batch-size" => options.batch_size = Some(parse_number(&args, &mut idx, flag)?),
            "--seed" => options.seed = Some(parse_number(&args, &mut idx, flag)?),
            "--validation-fraction" => {
                options.validation_fraction = Some(parse_number(&args, &mut idx, flag)?);
            }
            "--rounds" => options.rounds = Some(parse_number(&args, &mut idx, flag)?),
            "--gbdt-learning-rate" => {
                options.gbdt_learning_rate = Some(parse_number(&args, &mut idx, flag)?);
            }
            "--gbdt-l2" => options.gbdt_l2 = Some(parse_number(&args, &mut idx, flag)?),
            "--bins" => options.bins = Some(parse_number(&args, &mut idx, flag)?),
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn take_value<'a>(args: &'a [String], idx: &mut usize, flag: &str) -> Result<&'a str, String> {
    *idx += 1;
    args.get(*idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_number<T: std::str::FromStr>(
    args: &[String],
    idx: &mut usize,
    flag: &str,
) -> Result<T, String> {
    let value = take_value(args, idx, flag)?;
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn help_text() -> String {
    [
        "startup-odds-train",
        "",
        "Usage:",
        "  startup-odds-train --data <file.csv|.jsonl|.json> [options]",
        "",
        "Options:",
        "  --out <file>                 Artifact path (default: configured model path).",
        "  --config <file>              Config file (default: <app root>/config.toml).",
        "  --classifier <logreg|gbdt_stump>",
        "  --epochs <n>                 Logistic regression epochs.",
        "  --learning-rate <x>          Logistic regression SGD step.",
        "  --l2 <x>                     Logistic regression L2 penalty.",
        "  --batch-size <n>",
        "  --seed <n>                   Split and shuffle seed.",
        "  --validation-fraction <x>    Held-out share in [0, 0.9].",
        "  --rounds <n>                 Boosting rounds.",
        "  --gbdt-learning-rate <x>     Boosting shrinkage per round.",
        "  --gbdt-l2 <x>                Boosting L2 penalty on leaf values.",
        "  --bins <n>                   Split-search bins for boosting.",
        "  --balance-classes            Class-balanced SGD weights (intercept re-centered).",
    ]
    .join("\n")
}
