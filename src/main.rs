use anyhow::{anyhow, bail, Context};
use clap::Parser;
use hydrorisk::adapters::{start_api_server, FeatureStore, PostgresFeatureStore};
use hydrorisk::api::AppState;
use hydrorisk::cli::{Cli, Commands};
use hydrorisk::config::{AppConfig, LoadMode};
use hydrorisk::domain::RiskFeaturesInput;
use hydrorisk::ml::{LoadedModel, ModelRegistry, PredictionAssembler};
use hydrorisk::services::{RiskService, RiskServiceConfig};
use std::io::Read;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::signal;
use tracing::{error, info, warn};

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Serve => {
            init_logging(&config.logging);
            run_serve(config).await?;
        }
        Commands::Predict { input } => {
            init_logging_simple();
            run_predict(config, input).await?;
        }
        Commands::Inspect => {
            init_logging_simple();
            run_inspect(&config)?;
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = if cli.config.is_dir() {
        AppConfig::load_from(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        AppConfig::default_config(std::path::Path::new("models/dam_risk/manifest.json"))
    };
    if let Some(manifest) = &cli.manifest {
        config.model.manifest_path = manifest.clone();
    }
    if let Err(errors) = config.validate() {
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(config)
}

fn build_service(config: &AppConfig, load_mode: LoadMode) -> anyhow::Result<Arc<RiskService>> {
    let registry = Arc::new(ModelRegistry::new(
        &config.model.manifest_path,
        config.model.load_timeout(),
    ));
    Ok(Arc::new(RiskService::new(
        registry,
        PredictionAssembler::new(config.model.confidence_policy()),
        RiskServiceConfig {
            load_mode,
            strict_categories: config.model.strict_categories,
            defaults: config.defaults.clone(),
        },
    )))
}

async fn run_serve(config: AppConfig) -> anyhow::Result<()> {
    let risk = build_service(&config, config.model.load_mode)?;

    let store: Option<Arc<dyn FeatureStore>> = match &config.database {
        Some(db) => {
            let store = PostgresFeatureStore::new(&db.url, db.max_connections).await?;
            if db.migrate {
                store.migrate().await?;
            }
            Some(Arc::new(store))
        }
        None => {
            warn!("no database configured, /api/model/random and /api/features are disabled");
            None
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;

    // Eager mode loads in the background; the server answers 503 until it
    // finishes. A failed load is fatal.
    let load_failure: Arc<OnceLock<String>> = Arc::new(OnceLock::new());
    let (failed_tx, failed_rx) = tokio::sync::oneshot::channel::<()>();
    if config.model.load_mode == LoadMode::Eager {
        let registry = Arc::clone(risk.registry());
        let load_failure = Arc::clone(&load_failure);
        tokio::spawn(async move {
            if let Err(e) = registry.load().await {
                let _ = load_failure.set(e.to_string());
                let _ = failed_tx.send(());
            }
        });
    } else {
        drop(failed_tx);
    }

    let shutdown = async move {
        tokio::select! {
            _ = signal::ctrl_c() => info!("shutdown signal received"),
            Ok(()) = failed_rx => error!("risk model failed to load, shutting down"),
        }
    };

    start_api_server(AppState::new(risk, store), addr, shutdown).await?;

    if let Some(reason) = load_failure.get() {
        bail!("risk model failed to load: {reason}");
    }
    Ok(())
}

async fn run_predict(config: AppConfig, input: &str) -> anyhow::Result<()> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {input}"))?
    };
    let features: RiskFeaturesInput = serde_json::from_str(&raw).context("parsing input JSON")?;

    let risk = build_service(&config, LoadMode::Lazy)?;
    let prediction = risk.predict_input(features).await?;
    println!("{}", serde_json::to_string_pretty(&risk.respond(&prediction))?);
    Ok(())
}

fn run_inspect(config: &AppConfig) -> anyhow::Result<()> {
    let model = LoadedModel::from_manifest(&config.model.manifest_path)
        .map_err(|e| anyhow!("{}: {e}", config.model.manifest_path.display()))?;
    let manifest = model.manifest();

    println!("model:      {}", manifest.model_id());
    println!(
        "classifier: {} ({})",
        manifest.classifier.format(),
        manifest.classifier.path().display()
    );
    println!("loaded at:  {}", model.loaded_at());
    println!();
    println!("{:<4} {:<28} {:>12} {:>12}", "#", "feature", "mean", "std");
    for (idx, name) in model.normalizer().expected_features().iter().enumerate() {
        match manifest.preprocessing.numeric.iter().find(|c| &c.column == name) {
            Some(col) => println!("{idx:<4} {name:<28} {:>12.4} {:>12.4}", col.mean, col.std),
            None => println!("{idx:<4} {name:<28} {:>12} {:>12}", "-", "-"),
        }
    }
    for field in &manifest.preprocessing.categorical {
        let vocab = model.normalizer().vocabulary(field).unwrap_or_default();
        println!();
        println!("{field}: {}", vocab.join(", "));
    }
    Ok(())
}
