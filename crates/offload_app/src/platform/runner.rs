use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use offload_app::{
    load_settings, Coordinator, CoordinatorSettings, Dataset, FallbackPolicy, FileHandle,
};
use offload_logging::{offload_info, offload_warn};

use super::cli::Args;

pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    offload_logging::initialize(level, args.log_file.as_deref());

    let settings = resolve_settings(&args)?;
    let coordinator = Coordinator::new(settings);
    let outcome = drive(&coordinator, &args).await;
    coordinator.shutdown();

    let dataset = outcome?;
    let pretty = serde_json::to_string_pretty(&*dataset).context("failed to render records")?;
    println!("{pretty}");
    Ok(())
}

fn resolve_settings(args: &Args) -> anyhow::Result<CoordinatorSettings> {
    let mut settings = match &args.config {
        Some(path) => load_settings(path)?,
        None => CoordinatorSettings::default(),
    };
    if let Some(timeout_ms) = args.timeout_ms {
        settings.request_timeout_ms = (timeout_ms > 0).then_some(timeout_ms);
    }
    if args.inline_fallback {
        settings.fallback = FallbackPolicy::Inline;
    }
    Ok(settings)
}

async fn drive(coordinator: &Coordinator, args: &Args) -> anyhow::Result<Arc<Dataset>> {
    let file = FileHandle::from_path(args.file.clone());
    let mut dataset = coordinator
        .load(Some(file))
        .await
        .with_context(|| format!("failed to load {}", args.file.display()))?;
    offload_info!("Loaded {} records from {:?}", dataset.len(), args.file);

    if args.sort {
        dataset = coordinator.sort().await.context("sort failed")?;
    }

    for text in &args.filters {
        if dataset.is_empty() {
            offload_warn!("No records left; skipping filter {:?}", text);
            break;
        }
        dataset = coordinator
            .filter(text)
            .await
            .with_context(|| format!("filter {text:?} failed"))?;
        offload_info!("Filter {:?} kept {} records", text, dataset.len());
    }

    Ok(dataset)
}
