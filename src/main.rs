//! Entry point for the startup success prediction service.

use std::path::PathBuf;

use startup_odds::config::ServiceConfig;
use startup_odds::logging;
use startup_odds::model_store::ModelStore;
use startup_odds::server;
use tracing::error;

fn main() {
    if let Err(err) = logging::init("serve") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    model: Option<PathBuf>,
    bind: Option<String>,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config = ServiceConfig::load(options.config.as_deref()).map_err(|err| err.to_string())?;
    if let Some(model) = options.model {
        config.model.artifact_path = Some(model);
    }
    if let Some(bind) = options.bind {
        config.server.bind = bind;
    }
    config.validate().map_err(|err| err.to_string())?;

    let artifact_path = config.artifact_path().map_err(|err| err.to_string())?;
    let store = ModelStore::load(&artifact_path).map_err(|err| err.to_string())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to start async runtime: {err}"))?;
    runtime
        .block_on(server::serve(&config.server, &store))
        .map_err(|err| err.to_string())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                options.model = Some(PathBuf::from(value));
            }
            "--bind" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--bind requires a value".to_string())?;
                options.bind = Some(value.to_string());
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "startup-odds",
        "",
        "Usage:",
        "  startup-odds [options]",
        "",
        "Options:",
        "  --config <file>   Config file (default: <app root>/config.toml).",
        "  --model <file>    Model artifact to serve.",
        "  --bind <addr>     Listen address (default: 127.0.0.1:5000).",
    ]
    .join("\n")
}
