use clap::{Args, Parser, Subcommand};
use rl_core::{Article, ArticleFields, Error, Result, SuggestionFilter};
use rl_inference::{create_model, Config as InferenceConfig, ModelKind};
use rl_storage::{ArticleStore, StoreConfig, TopicDefault};
use rl_web::{Actions, AppState, GenerateMetadataInput, UnifyTopicsInput};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Request timeout given as `1m30s`, `500ms` or a bare number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timeout(Duration);

impl FromStr for Timeout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(seconds) = s.parse::<u64>() {
            return Timeout::positive(Duration::from_secs(seconds));
        }

        let mut total = Duration::ZERO;
        let mut rest = s;
        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits == 0 {
                return Err(format!("expected a number in '{}'", s));
            }
            let amount: u64 = rest[..digits].parse().map_err(|_| format!("number too large in '{}'", s))?;
            rest = &rest[digits..];

            let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
            total += match &rest[..unit_len] {
                "ms" => Duration::from_millis(amount),
                "s" => Duration::from_secs(amount),
                "m" => Duration::from_secs(amount.saturating_mul(60)),
                "h" => Duration::from_secs(amount.saturating_mul(3600)),
                unit => return Err(format!("unknown unit '{}' (use ms, s, m or h)", unit)),
            };
            rest = &rest[unit_len..];
        }
        Timeout::positive(total)
    }
}

impl Timeout {
    fn positive(duration: Duration) -> std::result::Result<Self, String> {
        if duration.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }
        Ok(Timeout(duration))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Save articles now, read them later", long_about = None)]
pub struct Cli {
    /// Storage backend: file or memory
    #[arg(long, env = "READLATER_STORAGE", default_value = "file", global = true)]
    storage: String,
    /// Directory holding the article collection (file storage)
    #[arg(long, env = "READLATER_DATA_DIR", default_value = rl_storage::DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,
    /// When articles saved without a topic get the default one
    #[arg(long, value_enum, default_value_t = TopicDefault::OnCreate, global = true)]
    topic_default: TopicDefault,
    /// Model used for metadata generation and topic unification
    #[arg(long, value_enum, env = "READLATER_MODEL", default_value_t = ModelKind::Gemini, global = true)]
    model: ModelKind,
    #[arg(long, env = "READLATER_MODEL_URL", global = true)]
    model_url: Option<String>,
    #[arg(long, env = "READLATER_MODEL_NAME", global = true)]
    model_name: Option<String>,
    #[arg(long, env = "READLATER_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
    /// Timeout for a single model request (e.g. 30s, 2m)
    #[arg(long, default_value = "60s", global = true)]
    timeout: Timeout,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct FieldArgs {
    #[arg(long)]
    headline: Option<String>,
    #[arg(long)]
    topic: Option<String>,
    #[arg(long)]
    summary: Option<String>,
    /// Estimated reading time in minutes
    #[arg(long)]
    minutes: Option<u32>,
}

impl FieldArgs {
    fn to_fields(&self) -> ArticleFields {
        ArticleFields {
            headline: self.headline.clone(),
            topic: self.topic.clone(),
            summary: self.summary.clone(),
            estimated_time: self.minutes,
            ..ArticleFields::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save an article
    Add {
        url: String,
        /// Fill in headline, topic, reading time and summary with the model
        #[arg(long)]
        generate: bool,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// List saved articles, newest first
    List {
        #[arg(long)]
        unread: bool,
    },
    /// Show one article
    Show { id: String },
    /// Change fields of an article
    Edit {
        id: String,
        #[arg(long)]
        url: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Mark an article as read
    Read { id: String },
    /// Mark an article as unread
    Unread { id: String },
    /// Delete an article
    Delete { id: String },
    /// List topics in use
    Topics,
    /// Find unread articles for a topic and time budget
    Suggest {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        max_minutes: Option<u32>,
    },
    /// Generate metadata for a URL without saving it
    Generate { url: String },
    /// Propose merged topic labels
    Unify {
        /// Relabel the saved articles with the proposal
        #[arg(long)]
        apply: bool,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value = "127.0.0.1:9002")]
        addr: SocketAddr,
    },
}

impl Cli {
    fn open_store(&self) -> ArticleStore {
        let config = StoreConfig {
            topic_default: self.topic_default,
            ..StoreConfig::default()
        };
        match rl_storage::create_storage(&self.storage, Some(&self.data_dir)) {
            Ok(storage) => {
                info!("💾 Using {} storage", storage.name());
                ArticleStore::with_config(Some(storage), config)
            }
            Err(e) => {
                warn!("⚠️ Storage unavailable ({}), nothing will be saved", e);
                ArticleStore::with_config(None, config)
            }
        }
    }

    fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            model: self.model,
            api_key: self.api_key.clone(),
            model_name: self.model_name.clone(),
            model_url: self.model_url.clone(),
            timeout: Some(self.timeout.0),
        }
    }

    fn actions(&self) -> Result<Actions> {
        Ok(Actions::new(create_model(&self.inference_config())?))
    }
}

fn format_article(article: &Article) -> String {
    let mut line = format!(
        "[{}] {}  {}",
        if article.is_read { "x" } else { " " },
        article.id,
        article.headline.as_deref().unwrap_or(&article.url)
    );
    line.push_str(&format!("  ({}", article.effective_topic()));
    if let Some(minutes) = article.estimated_time {
        line.push_str(&format!(", {} min", minutes));
    }
    line.push(')');
    line
}

fn write_article_details(out: &mut dyn Write, article: &Article) -> Result<()> {
    let saved = chrono::DateTime::from_timestamp_millis(article.created_at)
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| article.created_at.to_string());

    writeln!(out, "{}", article.headline.as_deref().unwrap_or("Untitled Article"))?;
    writeln!(out, "  id:       {}", article.id)?;
    writeln!(out, "  url:      {}", article.url)?;
    writeln!(out, "  topic:    {}", article.effective_topic())?;
    match article.estimated_time {
        Some(minutes) => writeln!(out, "  reading:  {} min", minutes)?,
        None => writeln!(out, "  reading:  unknown")?,
    }
    writeln!(out, "  status:   {}", if article.is_read { "read" } else { "unread" })?;
    writeln!(out, "  saved:    {}", saved)?;
    writeln!(out, "  summary:  {}", article.summary.as_deref().unwrap_or("No summary available."))?;
    Ok(())
}

fn write_articles(out: &mut dyn Write, articles: &[Article]) -> Result<()> {
    if articles.is_empty() {
        writeln!(out, "No articles found.")?;
    }
    for article in articles {
        writeln!(out, "{}", format_article(article))?;
    }
    Ok(())
}

fn not_found(id: &str) -> Error {
    Error::NotFound(id.to_string())
}

async fn execute(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let store = cli.open_store();

    match &cli.command {
        Commands::Add { url, generate, fields } => {
            let mut base = ArticleFields::new();
            if *generate {
                info!("🧠 Generating metadata for {}", url);
                let result = cli
                    .actions()?
                    .generate_metadata(GenerateMetadataInput { url: url.clone() })
                    .await;
                base = result.into_result().map_err(Error::Generation)?.into();
            }
            let article = store.create(base.merged_with(fields.to_fields()), url.clone());
            writeln!(out, "{}", format_article(&article))?;
        }
        Commands::List { unread } => {
            let articles = if *unread { store.unread() } else { store.list() };
            write_articles(out, &articles)?;
        }
        Commands::Show { id } => {
            let article = store.get_by_id(id).ok_or_else(|| not_found(id))?;
            write_article_details(out, &article)?;
        }
        Commands::Edit { id, url, fields } => {
            let mut update = fields.to_fields();
            update.url = url.clone();
            let article = store.update(id, update).ok_or_else(|| not_found(id))?;
            writeln!(out, "{}", format_article(&article))?;
        }
        Commands::Read { id } => {
            let article = store.set_read(id, true).ok_or_else(|| not_found(id))?;
            writeln!(out, "{}", format_article(&article))?;
        }
        Commands::Unread { id } => {
            let article = store.set_read(id, false).ok_or_else(|| not_found(id))?;
            writeln!(out, "{}", format_article(&article))?;
        }
        Commands::Delete { id } => {
            store.delete(id);
            writeln!(out, "Deleted {}", id)?;
        }
        Commands::Topics => {
            for topic in store.unique_topics() {
                writeln!(out, "{}", topic)?;
            }
        }
        Commands::Suggest { topic, max_minutes } => {
            let filter = SuggestionFilter {
                topic: topic.clone(),
                max_minutes: *max_minutes,
            };
            write_articles(out, &store.suggest(&filter))?;
        }
        Commands::Generate { url } => {
            let result = cli
                .actions()?
                .generate_metadata(GenerateMetadataInput { url: url.clone() })
                .await;
            writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
        }
        Commands::Unify { apply } => {
            let topics = store.unique_topics();
            let result = cli.actions()?.unify_topics(UnifyTopicsInput { topics }).await;
            writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
            if let (true, Some(map)) = (*apply, result.data.as_ref()) {
                let changed = store.apply_topic_map(map);
                writeln!(out, "Relabelled {} articles", changed)?;
            }
        }
        Commands::Serve { addr } => {
            let model = create_model(&cli.inference_config())?;
            info!("🧠 Inference model initialized (using {})", model.name());
            let state = AppState::new(Arc::new(store), model);
            rl_web::serve(*addr, state).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut stdout = std::io::stdout();
    execute(cli, &mut stdout).await
}
