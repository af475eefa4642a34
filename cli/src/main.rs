//! CLI entrypoint for docfiller
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod progress;

use anyhow::{Context, Result, bail};
use clap::Parser;
use commands::{Cli, Command, FillArgs, ProfileAction, SettingsAction};
use docfiller_application::{
    EngineContext, FillFormError, FillFormUseCase, FillOptions, FormCollaborators,
    MetricsRecorder, NoMetrics, Settings, SettingsStore,
};
use docfiller_domain::{Profile, ProfileCatalog, ProviderId, WeightTable};
use docfiller_infrastructure::{
    ConfigLoader, FileConfig, FormDocument, HttpProviderFactory, JsonFileSettingsStore,
    JsonFormHost, JsonlMetricsRecorder, MemorySettingsStore,
};
use progress::ProgressReporter;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting docfiller");

    let config = load_config(&cli)?;

    match &cli.command {
        Command::Fill(args) => run_fill(&cli, &config, args).await,
        Command::Config => run_config(&cli, &config),
        Command::Profiles { action } => run_profiles(&open_settings(&cli, &config), action).await,
        Command::Settings { action } => run_settings(&open_settings(&cli, &config), action).await,
    }
}

/// Initialize logging based on verbosity level; `RUST_LOG` wins when set
fn init_logging(
    verbose: u8,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            Ok(None)
        }
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        if let Some(path) = &cli.config
            && !path.exists()
        {
            bail!("Config file {} does not exist", path.display());
        }
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };

    let issues = config.validate();
    for issue in &issues {
        if issue.is_error() {
            error!("{}", issue.message);
        } else {
            warn!("{}", issue.message);
        }
    }
    if issues.iter().any(|i| i.is_error()) {
        bail!("Configuration has errors, run `docfiller config` for details");
    }

    Ok(config)
}

fn open_settings(cli: &Cli, config: &FileConfig) -> Settings {
    let store: Arc<dyn SettingsStore> = if cli.ephemeral {
        Arc::new(MemorySettingsStore::new())
    } else {
        Arc::new(JsonFileSettingsStore::new(config.storage.settings_path()))
    };
    Settings::new(store).with_defaults(config.fill_options())
}

/// Stored settings with this invocation's flags on top
async fn fill_options(settings: &Settings, args: &FillArgs) -> Result<FillOptions> {
    let mut options = match settings.fill_options().await {
        Ok(options) => options,
        Err(e) => {
            warn!("Could not read settings, using defaults: {}", e);
            settings.defaults().clone()
        }
    };

    if args.consensus {
        options.consensus = true;
    }
    if args.no_consensus {
        options.consensus = false;
    }
    if let Some(provider) = &args.provider {
        let provider: ProviderId = provider
            .parse()
            .with_context(|| format!("Invalid provider '{}'", provider))?;
        options.provider = provider;
    }
    if let Some(profile) = &args.profile {
        options.profile_key = Some(profile.clone());
    }
    if args.refill {
        options.skip_marked = false;
    }
    if args.no_magic {
        options.magic_prompt = false;
    }
    Ok(options)
}

async fn run_fill(cli: &Cli, config: &FileConfig, args: &FillArgs) -> Result<()> {
    let document = FormDocument::load(&args.form)
        .await
        .with_context(|| format!("Failed to read form {}", args.form.display()))?;

    // === Dependency Injection ===
    let settings = open_settings(cli, config);
    let options = fill_options(&settings, args).await?;

    let factory = Arc::new(HttpProviderFactory::new(config.providers.clone()));
    let engines = Arc::new(EngineContext::new(
        factory,
        settings,
        config.providers.weight_table(),
    ));

    let metrics_path = config.storage.metrics_path();
    let metrics: Arc<dyn MetricsRecorder> = match JsonlMetricsRecorder::open(&metrics_path) {
        Ok(recorder) => Arc::new(recorder),
        Err(e) => {
            warn!(
                "Could not open metrics file {}: {}",
                metrics_path.display(),
                e
            );
            Arc::new(NoMetrics)
        }
    };

    let host = Arc::new(JsonFormHost::new(document));
    let form = FormCollaborators::from_host(host.clone());

    // Ctrl-C stops the run after the current field
    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let use_case = FillFormUseCase::new(Arc::clone(&engines), metrics)
        .with_options(options)
        .with_cancellation(token);

    let result = if cli.quiet {
        use_case.execute(&form).await
    } else {
        let progress = ProgressReporter::new();
        use_case.execute_with_progress(&form, &progress).await
    };
    engines.dispose().await;

    let report = match result {
        Ok(report) => report,
        Err(FillFormError::Configuration(issues)) => {
            for issue in &issues {
                error!("{}", issue);
            }
            let providers: Vec<String> = issues.iter().map(|e| e.provider().to_string()).collect();
            bail!("Misconfigured providers: {}", providers.join(", "));
        }
        Err(e) => return Err(e.into()),
    };

    let output = host.output(Some(report.metrics.clone()));
    match &args.output {
        Some(path) => {
            output
                .save(path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!("Answers written to {}", path.display());
            }
        }
        None => println!("{}", serde_json::to_string_pretty(&output)?),
    }

    let metrics = &report.metrics;
    info!(
        "{} of {} attempted fields filled ({} questions)",
        metrics.successful, metrics.to_be_filled, metrics.total_questions
    );
    Ok(())
}

fn run_config(cli: &Cli, config: &FileConfig) -> Result<()> {
    println!("Configuration sources (in priority order):");
    for line in ConfigLoader::describe_sources(cli.config.as_ref()) {
        println!("  {}", line);
    }
    println!();

    println!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);

    let issues = config.validate();
    if issues.is_empty() {
        println!("No configuration issues.");
    } else {
        for issue in issues {
            println!("{}", issue);
        }
    }
    Ok(())
}

async fn run_profiles(settings: &Settings, action: &ProfileAction) -> Result<()> {
    match action {
        ProfileAction::List => {
            let catalog = settings.load_profiles().await?;
            let selected = settings.selected_profile_key().await?;
            let (active, _) = catalog.resolve(selected.as_deref());
            for key in catalog.keys() {
                let Some(profile) = catalog.get(key) else {
                    continue;
                };
                let marker = if key == active { "*" } else { " " };
                let kind = if profile.is_magic {
                    "magic"
                } else if profile.is_custom {
                    "custom"
                } else {
                    "built-in"
                };
                println!("{} {:<20} {:<24} [{}]", marker, key, profile.name, kind);
            }
        }
        ProfileAction::Add {
            key,
            system_prompt,
            name,
            magic,
        } => {
            if ProfileCatalog::is_builtin_key(key) {
                bail!("'{}' is a built-in profile key", key);
            }
            let name = name.clone().unwrap_or_else(|| key.clone());
            let mut profile = Profile::custom(name, system_prompt.clone());
            profile.is_magic = *magic;
            settings.save_custom_profile(key, profile).await?;
            println!("Saved profile '{}'", key);
        }
        ProfileAction::Delete { key } => {
            if ProfileCatalog::is_builtin_key(key) {
                bail!("'{}' is a built-in profile and cannot be deleted", key);
            }
            settings.delete_profile(key).await?;
            println!("Deleted profile '{}'", key);
        }
        ProfileAction::Select { key } => {
            let catalog = settings.load_profiles().await?;
            if catalog.get(key).is_none() {
                bail!("Unknown profile '{}'", key);
            }
            settings.set_selected_profile_key(key).await?;
            println!("Selected profile '{}'", key);
        }
    }
    Ok(())
}

async fn run_settings(settings: &Settings, action: &SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let options = settings.fill_options().await?;
            println!("consensus:     {}", options.consensus);
            println!("model:         {}", options.provider);
            println!("skip marked:   {}", options.skip_marked);
            println!("dim skipped:   {}", options.dim_skipped);
            println!(
                "profile:       {}",
                options.profile_key.as_deref().unwrap_or("(default)")
            );
            match settings.llm_weights().await? {
                Some(weights) => {
                    let listed: Vec<String> = weights
                        .iter()
                        .map(|(p, w)| format!("{}={}", p, w))
                        .collect();
                    println!("weights:       {}", listed.join(" "));
                }
                None => println!("weights:       (from configuration)"),
            }
        }
        SettingsAction::Weights { weights } => {
            let table = parse_weights(weights)?;
            settings.set_llm_weights(&table).await?;
            println!("Saved weights for {} providers", table.len());
        }
        SettingsAction::Consensus { state } => {
            settings.set_consensus_enabled(state.enabled()).await?;
        }
        SettingsAction::Model { provider } => {
            let provider: ProviderId = provider
                .parse()
                .with_context(|| format!("Invalid provider '{}'", provider))?;
            settings.set_llm_model(&provider).await?;
        }
        SettingsAction::SkipMarked { state } => {
            settings.set_skip_marked(state.enabled()).await?;
        }
    }
    Ok(())
}

/// Parse `provider=weight` pairs into a normalized table
fn parse_weights(pairs: &[String]) -> Result<WeightTable> {
    let mut table = WeightTable::new();
    for pair in pairs {
        let Some((provider, weight)) = pair.split_once('=') else {
            bail!("Expected PROVIDER=WEIGHT, got '{}'", pair);
        };
        let provider: ProviderId = provider
            .parse()
            .with_context(|| format!("Invalid provider in '{}'", pair))?;
        let weight: f64 = weight
            .trim()
            .parse()
            .with_context(|| format!("Invalid weight in '{}'", pair))?;
        if !weight.is_finite() || weight < 0.0 {
            bail!("Weight must be a non-negative number, got '{}'", pair);
        }
        table.set([(provider, weight)]);
    }
    if table.active().next().is_none() {
        bail!("At least one provider needs a positive weight");
    }
    table.normalize();
    Ok(table)
}
