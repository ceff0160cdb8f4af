//! multillm - Multi-provider LLM query routing and response evaluation
//!
//! Command-line front end: route a prompt by use case, fan it out to every
//! provider, and compare the answers.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use multillm::config::{Config, KeySource};
use multillm::evaluator::{Comparison, OutcomeComparison, RankingWeights};
use multillm::{GenerateOptions, ResponseRecord, Router, UseCase};

/// Provider list used when no configuration file exists.
const BUILTIN_CONFIG: &str = include_str!("../config.example.toml");

#[derive(Parser)]
#[command(name = "multillm")]
#[command(about = "Multi-provider LLM query routing and response evaluation")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Prompt to send
    prompt: String,

    /// Maximum tokens to generate
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Per-call deadline in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl QueryArgs {
    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    Check,

    /// Show configured providers and how their keys resolve
    Providers,

    /// Send a prompt to the best provider for a use case, or to one provider
    Ask {
        #[command(flatten)]
        query: QueryArgs,

        /// Use case driving provider preference
        #[arg(short, long, default_value = "general", conflicts_with = "provider")]
        use_case: UseCase,

        /// Query this provider directly
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Send a prompt to every provider and rank the answers
    Compare {
        #[command(flatten)]
        query: QueryArgs,

        /// Override the configured readability weight
        #[arg(long)]
        readability_weight: Option<f64>,

        /// Override the configured speed weight
        #[arg(long)]
        speed_weight: Option<f64>,
    },

    /// Explain provider preference for a use case (all use cases if omitted)
    Explain {
        use_case: Option<UseCase>,
    },
}

fn load_config(path: &str) -> anyhow::Result<(Config, Vec<(String, KeySource)>)> {
    if Path::new(path).exists() {
        Config::from_file_with_env(path).with_context(|| format!("loading {}", path))
    } else {
        let loaded = Config::parse_str_with_env(BUILTIN_CONFIG)
            .context("parsing built-in provider list")?;
        Ok(loaded)
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("multillm={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_exists = Path::new(&cli.config).exists();
    let (config, key_sources) = load_config(&cli.config)?;

    init_tracing(&config.logging.level);
    if config_exists {
        tracing::debug!(config = %cli.config, "Loaded configuration");
    } else {
        tracing::info!(config = %cli.config, "Config file not found, using built-in provider list");
    }

    match cli.command {
        Commands::Check => {
            println!("Configuration OK");
            println!("  providers: {}", config.providers.len());
            for (name, source) in &key_sources {
                println!("  {}: key {}", name, source);
            }
            Ok(())
        }

        Commands::Providers => {
            let router = Router::from_config(&config)?;
            println!(
                "{:<14} {:<18} {:<40} {:<22} {}",
                "NAME", "KIND", "MODEL", "KEY", "STATUS"
            );
            for provider in &config.providers {
                let source = key_sources
                    .iter()
                    .find(|(name, _)| name == &provider.name)
                    .map(|(_, s)| s.to_string())
                    .unwrap_or_else(|| KeySource::Missing.to_string());
                let status = if router.contains(&provider.name) {
                    "ready"
                } else {
                    "missing key"
                };
                println!(
                    "{:<14} {:<18} {:<40} {:<22} {}",
                    provider.name,
                    provider.kind().to_string(),
                    provider.model(),
                    source,
                    status
                );
            }
            Ok(())
        }

        Commands::Ask {
            query,
            use_case,
            provider,
        } => {
            let router = Router::from_config(&config)?;
            let options = query.options();
            let record = match provider {
                Some(id) => router.query_single(&id, &query.prompt, &options).await?,
                None => {
                    router
                        .query_best_for_use_case(&query.prompt, use_case, &options)
                        .await?
                }
            };

            let evaluation = config.evaluation.evaluator().evaluate(&record);
            if query.json {
                let out = serde_json::json!({
                    "response": record,
                    "evaluation": evaluation,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_record(&record);
                println!(
                    "readability: {:.1} ({}) | speed: {}",
                    evaluation.readability.flesch_reading_ease,
                    evaluation.readability.band.label(),
                    evaluation.speed_rating
                );
            }
            Ok(())
        }

        Commands::Compare {
            query,
            readability_weight,
            speed_weight,
        } => {
            let defaults = config.evaluation.weights();
            let weights = RankingWeights {
                readability: readability_weight.unwrap_or(defaults.readability),
                speed: speed_weight.unwrap_or(defaults.speed),
            };
            weights.validate().map_err(anyhow::Error::msg)?;

            let router = Router::from_config(&config)?;
            let outcomes = router.query_all(&query.prompt, &query.options()).await?;
            let result = config
                .evaluation
                .evaluator()
                .with_weights(weights)
                .compare_outcomes(&outcomes);

            if query.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_outcomes(&result);
            }
            Ok(())
        }

        Commands::Explain { use_case } => {
            let router = Router::from_config(&config)?;
            let use_cases = match use_case {
                Some(u) => vec![u],
                None => UseCase::ALL.to_vec(),
            };
            for use_case in use_cases {
                println!("{}", use_case);
                println!("  {}", use_case.explanation());
                match router.policy().preferences(use_case) {
                    Some(order) => {
                        for (rank, id) in order.iter().enumerate() {
                            let mark = if router.contains(id) { "" } else { " (not registered)" };
                            println!("  {}. {}{}", rank + 1, id, mark);
                        }
                    }
                    None => println!("  no preference list configured"),
                }
            }
            Ok(())
        }
    }
}

fn print_record(record: &ResponseRecord) {
    println!(
        "[{} / {}] {} ms, {} tokens, ${:.4}",
        record.provider_name(),
        record.model(),
        record.latency_ms(),
        record.token_count(),
        record.estimated_cost()
    );
    println!();
    println!("{}", record.content());
    println!();
}

fn print_comparison(comparison: &Comparison) {
    for (rank, eval) in comparison.ranked().enumerate() {
        println!(
            "{}. {:<14} score {:.3} | readability {:.1} ({}) | {} ms ({}) | {} tokens",
            rank + 1,
            eval.provider_name,
            eval.combined_score,
            eval.readability.flesch_reading_ease,
            eval.readability.band.label(),
            eval.latency_ms,
            eval.speed_rating,
            eval.token_count
        );
    }
    if let Some(fastest) = &comparison.fastest {
        println!("fastest: {}", fastest);
    }
    if let Some(readable) = &comparison.most_readable {
        println!("most readable: {}", readable);
    }
}

fn print_outcomes(result: &OutcomeComparison) {
    println!("{}/{} providers responded", result.successful, result.total);
    print_comparison(&result.comparison);
    for failure in &result.failures {
        println!("failed: {} ({})", failure.provider, failure.error);
    }
}
