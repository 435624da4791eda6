//! Modernizer CLI: code explanation knowledge base with MCP server.
//!
//! Usage:
//!   modernizer mcp [--transport stdio]
//!   modernizer generate <code> [--instruct-type set | --instruct text] [--git-url url]
//!   modernizer vote <prompt-id> [--down]
//!   modernizer best|random|list|count <code>
//!   modernizer show <prompt-id>
//!   modernizer similar <query> [--certainty 0.8]
//!   modernizer reconcile

use clap::{Parser, Subcommand, ValueEnum};
use modernizer::{
    Embedder, EngineConfig, GenerateParams, HashingEmbedder, ModernizerApi, OllamaEmbedder,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "modernizer",
    version,
    about = "Ranked LLM explanations of code fragments"
)]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Base URL of the Ollama-compatible inference service
    #[arg(long, global = true)]
    ollama_url: Option<String>,
    /// Model used for generation
    #[arg(long, global = true)]
    model: Option<String>,
    /// Embedding backend for meaning-similarity search
    #[arg(long, global = true, value_enum, default_value_t = EmbedderKind::Hashing)]
    embedder: EmbedderKind,
    /// Log filter, e.g. "info" or "modernizer=debug"
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    /// Offline feature hashing
    Hashing,
    /// The inference service's /api/embeddings endpoint
    Ollama,
    /// Local ONNX model (requires the `embeddings` feature)
    Fastembed,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP (Model Context Protocol) server
    Mcp {
        /// Transport type (currently only stdio)
        #[arg(long, default_value = "stdio")]
        transport: String,
    },
    /// Explain a code fragment and store the result
    Generate {
        code: String,
        /// Instruction set to draw from
        #[arg(long)]
        instruct_type: Option<String>,
        /// Literal instruction
        #[arg(long, conflicts_with = "instruct_type")]
        instruct: Option<String>,
        /// Repository the code comes from
        #[arg(long)]
        git_url: Option<String>,
    },
    /// Vote on a prompt
    Vote {
        prompt_id: String,
        /// Downvote instead of upvote
        #[arg(long)]
        down: bool,
    },
    /// Best-ranked response for matching code
    Best { code: String },
    /// Random response for matching code
    Random { code: String },
    /// Everything about one prompt
    Show { prompt_id: String },
    /// Prompt IDs for matching code, highest rank first
    List { code: String },
    /// Source URLs of code with a similar meaning
    Similar {
        query: String,
        #[arg(long)]
        certainty: Option<f32>,
    },
    /// Number of prompts for matching code
    Count { code: String },
    /// Repair unfinished response and meaning links
    Reconcile,
    /// List instruction sets, or the members of one set
    Instructs { set: Option<String> },
}

/// Get the default database path (~/.local/share/modernizer/modernizer.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("modernizer").join("modernizer.db")
}

fn init_logging(filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // stdout carries MCP traffic
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_embedder(kind: EmbedderKind, config: &EngineConfig) -> Result<Arc<dyn Embedder>, String> {
    match kind {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::default())),
        EmbedderKind::Ollama => OllamaEmbedder::new(
            &config.inference.base_url,
            &config.inference.model,
            Duration::from_secs(30),
        )
        .map(|e| Arc::new(e) as Arc<dyn Embedder>)
        .map_err(|e| e.to_string()),
        #[cfg(feature = "embeddings")]
        EmbedderKind::Fastembed => modernizer::FastEmbedEmbedder::default_model()
            .map(|e| Arc::new(e) as Arc<dyn Embedder>)
            .map_err(|e| e.to_string()),
        #[cfg(not(feature = "embeddings"))]
        EmbedderKind::Fastembed => {
            Err("fastembed support requires building with --features embeddings".to_string())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn report<T: Serialize>(result: modernizer::EngineResult<T>) -> i32 {
    match result {
        Ok(value) => print_json(&value),
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_client_error() {
                2
            } else {
                1
            }
        }
    }
}

/// Generate, then wait for the background annotation so the process does
/// not exit under it.
async fn cmd_generate(api: &ModernizerApi, params: GenerateParams, wait: Duration) -> i32 {
    let mut outcomes = api.subscribe_annotations();
    let generated = match api.generate(params).await {
        Ok(g) => g,
        Err(e) => return report::<()>(Err(e)),
    };
    let code = print_json(&generated);

    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, outcomes.recv()).await {
            Ok(Ok(outcome)) if outcome.prompt_id == generated.prompt_id => {
                if !outcome.status.is_success() {
                    eprintln!("Warning: semantic annotation failed: {:?}", outcome.status);
                }
                break;
            }
            Ok(Ok(_)) => continue,
            Ok(Err(_)) | Err(_) => {
                eprintln!("Warning: semantic annotation did not finish in time");
                break;
            }
        }
    }
    code
}

async fn run(cli: Cli, config: EngineConfig, api: ModernizerApi) -> i32 {
    let code = match cli.command {
        Commands::Mcp { transport } => {
            if transport != "stdio" {
                eprintln!("error: only 'stdio' transport is currently supported");
                return 1;
            }
            return modernizer::mcp::serve_stdio(api).await;
        }
        Commands::Generate {
            code,
            instruct_type,
            instruct,
            git_url,
        } => {
            let params = GenerateParams {
                code,
                instruct_type,
                instruct,
                git_url,
                model: None,
            };
            cmd_generate(&api, params, config.annotation.job_timeout).await
        }
        Commands::Vote { prompt_id, down } => report(
            api.vote(&prompt_id, !down)
                .await
                .map(|rank| serde_json::json!({ "prompt_id": prompt_id, "rank": rank })),
        ),
        Commands::Best { code } => report(api.best_response(&code).await),
        Commands::Random { code } => report(api.random_response(&code).await),
        Commands::Show { prompt_id } => report(api.response_by_id(&prompt_id).await),
        Commands::List { code } => report(api.response_list(&code).await),
        Commands::Similar { query, certainty } => report(api.similar_by_meaning(&query, certainty).await),
        Commands::Count { code } => report(api.prompt_count(&code).await),
        Commands::Reconcile => print_json(&api.reconcile().await),
        Commands::Instructs { set } => match set {
            Some(set) => report(api.instruct_members(&set).await),
            None => report(api.instruct_sets().await),
        },
    };
    api.shutdown().await;
    code
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut config = EngineConfig::from_env();
    if let Some(url) = cli.ollama_url.clone() {
        config.inference.base_url = url;
    }
    if let Some(model) = cli.model.clone() {
        config.inference.model = model;
    }
    config.db_path = Some(cli.db.clone().or(config.db_path.take()).unwrap_or_else(default_db_path));

    let embedder = match build_embedder(cli.embedder, &config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = rt.block_on(async {
        let api = match ModernizerApi::from_config(&config, embedder) {
            Ok(api) => api,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };
        run(cli, config, api).await
    });
    std::process::exit(code);
}
