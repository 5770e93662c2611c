use anyhow::Result;
use clap::{Parser, Subcommand};
use insight_engine::assistant::{AskOptions, DataAssistant};
use insight_engine::config::AppConfig;
use insight_engine::delegates::{HttpAnalysisDelegate, HttpNlSqlDelegate};
use insight_engine::execution::runner::QueryRunner;
use insight_engine::execution::store::DuckStore;
use insight_engine::quoting::normalize_dataset_name;
use insight_engine::schema_probe::SchemaProber;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "insight", about = "Ask questions of your datasets", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV/Parquet/JSON file as a dataset
    Load {
        /// File to import
        path: PathBuf,
        /// Dataset name; defaults to the file stem
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List imported datasets
    Tables,
    /// Show a dataset's columns and types
    Schema { dataset: String },
    /// Show the first rows of a dataset
    Preview {
        dataset: String,
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Run a read-only SQL query (guarded)
    Sql {
        query: String,
        #[arg(short, long)]
        limit: Option<usize>,
        /// Sample percentage in (0, 100]
        #[arg(short, long)]
        sample: Option<f64>,
    },
    /// Ask a natural-language question about a dataset
    Ask {
        question: String,
        #[arg(short, long)]
        dataset: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let store = Arc::new(DuckStore::open(&config.db_path)?);

    let result = run(cli.command, store, &config).await;
    if let Err(err) = result {
        if let Some(insight) = err.downcast_ref::<insight_engine::error::InsightError>() {
            eprintln!("{}", serde_json::to_string(&insight.payload())?);
        }
        return Err(err);
    }
    Ok(())
}

async fn run(command: Commands, store: Arc<DuckStore>, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Load { path, name } => {
            let table = name.unwrap_or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "dataset".to_string())
            });
            let table = normalize_dataset_name(&table);
            let report = store.load_file(&path, &table)?;
            print_json(&report)
        }
        Commands::Tables => print_json(&store.list_tables()?),
        Commands::Schema { dataset } => {
            let prober = SchemaProber::new(store);
            let profile = prober.profile(&normalize_dataset_name(&dataset))?;
            print_json(&profile.columns)
        }
        Commands::Preview { dataset, limit } => {
            let rows = store.sample(&normalize_dataset_name(&dataset), limit)?;
            print_json(&rows)
        }
        Commands::Sql { query, limit, sample } => {
            let runner = QueryRunner::new(store);
            let rows = runner.run_sql_safe(&query, limit, sample)?;
            print_json(&rows)
        }
        Commands::Ask { question, dataset, limit } => {
            let mut assistant = DataAssistant::new(store);
            if let Some(cfg) = config.nl_sql_delegate_config() {
                assistant = assistant.with_nl_sql_delegate(Arc::new(HttpNlSqlDelegate::new(cfg)?));
            }
            if let Some(cfg) = config.analysis_delegate_config() {
                assistant = assistant.with_analysis_delegate(Arc::new(HttpAnalysisDelegate::new(cfg)?));
            }
            let opts = AskOptions { limit, ..Default::default() };
            let answer = assistant.ask(&question, &dataset, &opts).await?;
            print_json(&answer)
        }
    }
}
