//! Evaluation CLI for trying recommendation quality by hand.
//!
//! Usage:
//!     eval recommend user_001 --text "想买联想笔记本" --limit 5
//!     eval intent "cheap noise cancelling headphones"
//!     eval profile user_002
//!     eval health

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use shelfwise_backend_openai::ConfiguredModel;
use shelfwise_engine::{EngineConfig, Recommendation, RecommendationRequest, Recommender};
use shelfwise_model::{IntentRecord, Strategy, UserProfile};
use shelfwise_store::{ConfiguredSink, JsonlRankingLog, MemoryStore};

type Engine = Recommender<ConfiguredModel, MemoryStore, ConfiguredSink>;

#[derive(Parser)]
#[command(name = "eval")]
#[command(about = "Evaluate recommendation quality")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON snapshot with `items` and `events` (demo data when omitted)
    #[arg(long)]
    data: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the catalog for a user
    Recommend {
        /// User identifier
        user: String,

        /// Free text describing what the user wants
        #[arg(short, long)]
        text: Option<String>,

        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,

        /// hybrid, intent_based, behavior_based (anything else blends equally)
        #[arg(short, long, default_value = "hybrid")]
        strategy: String,

        /// Session identifier (generated when omitted)
        #[arg(long)]
        session: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Analyze the intent of free text
    Intent {
        /// Text to analyze
        text: String,

        /// User identifier used for logging
        #[arg(short, long, default_value = "anonymous")]
        user: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show a user's behavior profile
    Profile {
        /// User identifier
        user: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check the completion model and the data store
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.store.snapshot_path = Some(data);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("shelfwise={}", config.logging.level).parse()?),
        )
        .init();

    tracing::debug!(
        snapshot = ?config.store.snapshot_path,
        ranking_log = ?config.store.ranking_log,
        "Loaded configuration"
    );

    let store = Arc::new(match &config.store.snapshot_path {
        Some(path) => MemoryStore::from_snapshot_file(path).await?,
        None => MemoryStore::demo(Utc::now()),
    });
    let sink = Arc::new(match &config.store.ranking_log {
        Some(path) => ConfiguredSink::Jsonl(JsonlRankingLog::new(path)),
        None => ConfiguredSink::Memory(Arc::clone(&store)),
    });
    let model = Arc::new(ConfiguredModel::from_config(config.llm.clone())?);

    let engine = Recommender::new(model, Arc::clone(&store), sink, &config);

    match cli.command {
        Commands::Recommend {
            user,
            text,
            limit,
            strategy,
            session,
            format,
        } => {
            let request = RecommendationRequest {
                user_id: user,
                text,
                session_id: session,
                limit,
                strategy: Strategy::from(strategy.as_str()),
            };
            run_recommend(&engine, request, &format).await?;
        }
        Commands::Intent { text, user, format } => {
            let record = engine.analyze_intent(&text, &user).await;
            print_intent(&record, &format)?;
        }
        Commands::Profile { user, format } => {
            let profiles = engine.profiles();
            let profile = profiles.build(&user, profiles.default_lookback()).await?;
            print_profile(&profile, &format)?;
        }
        Commands::Health => {
            run_health(&engine, &store).await?;
        }
    }

    engine.shutdown().await;

    Ok(())
}

async fn run_recommend(
    engine: &Engine,
    request: RecommendationRequest,
    format: &str,
) -> Result<()> {
    let result = match engine.get_recommendations(request).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}", e.user_message());
            if let Some(hint) = e.retry_hint() {
                eprintln!("Retry in {}s", hint.as_secs());
            }
            return Err(e.into());
        }
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_recommendation(&result);
    Ok(())
}

fn print_recommendation(result: &Recommendation) {
    println!(
        "User: {} | Session: {} | Strategy: {}",
        result.profile.user_id, result.session_id, result.ranking.strategy
    );
    if let Some(intent) = &result.intent {
        println!(
            "Intent: {} ({:.2}, {:?})",
            intent.category, intent.confidence, intent.source
        );
    }
    if result.profile_degraded {
        println!("Profile unavailable, behavior signal skipped");
    }
    println!("---");

    for (i, scored) in result.ranking.items.iter().enumerate() {
        let item = &scored.item;
        println!("\n{}. {} [{}] {} {}", i + 1, item.name, item.id, item.brand, item.category);
        println!("   Price: {:.2} | Rating: {:.1}", item.price, item.rating);
        println!(
            "   Score: {:.3} (intent {:.2}, behavior {:.2}, collaborative {:.2}, \
             content {:.2}, popularity {:.2})",
            scored.final_score,
            scored.scores.intent,
            scored.scores.behavior,
            scored.scores.collaborative,
            scored.scores.content,
            scored.scores.popularity
        );
        println!("   {}", scored.justification);
    }

    println!("\n---");
    println!("Total: {} results", result.ranking.len());
}

fn print_intent(record: &IntentRecord, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!("Intent: {} ({:?})", record.category, record.source);
    println!("Confidence: {:.2} | Urgency: {:.2}", record.confidence, record.urgency);
    if !record.preferred_categories.is_empty() {
        println!("Categories: {}", record.preferred_categories.join(", "));
    }
    if !record.preferred_brands.is_empty() {
        let brands: Vec<&str> = record.preferred_brands.iter().map(String::as_str).collect();
        println!("Brands: {}", brands.join(", "));
    }
    if let Some(bucket) = record.price_bucket {
        println!("Price: {}", bucket.as_str());
    }
    if !record.keywords.is_empty() {
        println!("Keywords: {}", record.keywords.join(", "));
    }
    if !record.summary.is_empty() {
        println!("Summary: {}", record.summary);
    }
    Ok(())
}

fn print_profile(profile: &UserProfile, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    println!("User: {} ({} events)", profile.user_id, profile.event_count);
    println!("Activity: {:.3}", profile.activity_level);
    for (category, weight) in &profile.category_preference {
        println!("   category {}: {:.3}", category, weight);
    }
    for (brand, weight) in &profile.brand_preference {
        println!("   brand {}: {:.3}", brand, weight);
    }
    if let Some(range) = profile.price_range {
        println!("Price range: {:.2} - {:.2}", range.min, range.max);
    }
    for (kind, count) in &profile.kind_counts {
        println!("   {}: {}", kind.as_str(), count);
    }
    Ok(())
}

async fn run_health(engine: &Engine, store: &MemoryStore) -> Result<()> {
    println!(
        "Store: {} items, {} events",
        store.item_count(),
        store.event_count()
    );
    print!("Checking {} model... ", engine.model_name());

    match engine.model_health().await {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED: {}", e);
            println!("Intent analysis will use the offline classifier");
            std::process::exit(1);
        }
    }
}
