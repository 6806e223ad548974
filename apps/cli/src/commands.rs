//! CLI command definitions, routing, and tracing setup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use scholarbot_core::assembler::ContextAssembler;
use scholarbot_core::conversation::{
    Conversation, PaperNote, ThreadMessage, note_lookup, paper_links,
};
use scholarbot_core::progress::ProgressSink;
use scholarbot_document::{
    ArxivApi, AutoLayoutExtractor, DocumentId, DocumentStore, FetchOptions, LayoutExtractor, arxiv,
};
use scholarbot_llm::OpenAiCompatClient;
use scholarbot_segmenter::segment;
use scholarbot_shared::{AppConfig, init_config, load_config, resolve_api_key};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Scholarbot: ask questions about research papers.
#[derive(Parser)]
#[command(
    name = "scholarbot",
    version,
    about = "Answer questions about papers using only their relevant sections.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Split a paper into named sections and list them.
    Sections {
        /// PDF or JSON layout: a path, file:// URL, or http(s) URL.
        document: String,

        /// Print each section's text after its heading.
        #[arg(long)]
        text: bool,

        /// Emit the sections as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question, screening every referenced paper section by section.
    Ask {
        /// The question to answer. arXiv links in it are picked up as papers.
        question: String,

        /// Extra papers to consult (PDF or JSON layout, path or URL).
        #[arg(short, long = "paper")]
        papers: Vec<String>,

        /// Earlier thread messages as a JSON array of `{"from_bot", "text"}`.
        #[arg(long)]
        thread: Option<PathBuf>,

        /// Model to use instead of the configured default.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "scholarbot=info",
        1 => "scholarbot=debug",
        _ => "scholarbot=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so answers on stdout stay clean.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sections {
            document,
            text,
            json,
        } => cmd_sections(&document, text, json).await,
        Command::Ask {
            question,
            papers,
            thread,
            model,
        } => cmd_ask(&question, &papers, thread.as_deref(), model.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_sections(document: &str, text: bool, json: bool) -> Result<()> {
    let config = load_config()?;
    let id = DocumentId::parse(document)?;

    let mut store = DocumentStore::new(&fetch_options(&config))?;
    let fetched = store.fetch(&id).await?;
    let layout = AutoLayoutExtractor.extract(&fetched)?;
    let paper = segment(&layout.pages, &config.segmenter)?;

    info!(
        document = %id,
        pages = paper.page_count(),
        sections = paper.len(),
        "paper segmented"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(paper.sections())?);
        return Ok(());
    }

    if paper.is_empty() {
        println!("No sections found in {id}");
        return Ok(());
    }

    for section in paper.sections() {
        println!(
            "{}  (pages {}-{})",
            section.name, section.start_page, section.end_page
        );
        if text {
            println!();
            println!("{}", paper.section_text(&section.name, &layout)?);
            println!();
        }
    }

    Ok(())
}

async fn cmd_ask(
    question: &str,
    papers: &[String],
    thread: Option<&Path>,
    model: Option<&str>,
) -> Result<()> {
    let mut config = load_config()?;
    if let Some(model) = model {
        config.model.default_model = model.to_string();
    }
    let api_key = resolve_api_key(&config)?;
    let client = OpenAiCompatClient::new(&config.model, api_key)?;

    let mut store = DocumentStore::new(&fetch_options(&config))?;
    let arxiv_api = ArxivApi::new(
        &config.assistant.arxiv_api_url,
        config.assistant.download_timeout_secs,
    )?;
    let extractor = AutoLayoutExtractor;

    let mut messages = match thread {
        Some(path) => read_thread(path)?,
        None => Vec::new(),
    };
    messages.push(ThreadMessage {
        from_bot: false,
        text: question.to_string(),
    });

    // Notes for papers linked in the thread; ones that fail to load are left out.
    let mut notes: HashMap<DocumentId, PaperNote> = HashMap::new();
    for message in messages.iter().filter(|m| !m.from_bot) {
        for link in paper_links(&message.text) {
            let id = DocumentId::Url(link);
            if notes.contains_key(&id) {
                continue;
            }
            match paper_note(&arxiv_api, &mut store, &extractor, &id).await {
                Ok(note) => {
                    notes.insert(id, note);
                }
                Err(e) => warn!(paper = %id, error = %e, "paper left out of the conversation"),
            }
        }
    }

    let (mut conversation, mut refs) = Conversation::from_thread(&messages, note_lookup(&notes));

    for raw in papers {
        let id = DocumentId::parse(raw)?;
        if refs.iter().any(|p| p.id == id) {
            continue;
        }
        let note = paper_note(&arxiv_api, &mut store, &extractor, &id).await?;
        refs.push(conversation.add_paper(id, &note));
    }

    info!(
        model = client.model(),
        papers = refs.len(),
        messages = conversation.len(),
        "answering question"
    );

    let progress = CliProgress::new();
    let mut assembler = ContextAssembler {
        model: &client,
        documents: &mut store,
        extractor: &extractor,
        segmenter: &config.segmenter,
        progress: &progress,
        progress_retries: config.assistant.progress_retries,
    };
    let answer = assembler.run_turn(conversation, &refs).await;
    progress.finish();

    println!("{answer}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fetch_options(config: &AppConfig) -> FetchOptions {
    FetchOptions {
        timeout_secs: config.assistant.download_timeout_secs,
    }
}

fn read_thread(path: &Path) -> Result<Vec<ThreadMessage>> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read thread file {}", path.display()))?;
    serde_json::from_str(&raw)
        .wrap_err_with(|| format!("invalid thread file {}", path.display()))
}

/// Title and abstract for a paper's placeholder note.
///
/// arXiv papers are looked up through the export API; anything else is
/// fetched and its layout's title and abstract are used.
async fn paper_note(
    arxiv_api: &ArxivApi,
    store: &mut DocumentStore,
    extractor: &dyn LayoutExtractor,
    id: &DocumentId,
) -> scholarbot_shared::Result<PaperNote> {
    if let DocumentId::Url(url) = id {
        if let Some(paper_id) = arxiv::paper_id(url) {
            let entry = arxiv_api.lookup(&paper_id).await?;
            return Ok(PaperNote {
                title: entry.title,
                abstract_text: entry.summary,
            });
        }
    }

    let document = store.fetch(id).await?;
    let layout = extractor.extract(&document)?;
    Ok(PaperNote {
        title: layout.title.unwrap_or_else(|| id.to_string()),
        abstract_text: layout.abstract_text.unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner whose message is replaced by each progress notification.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressSink for CliProgress {
    fn notify(&self, text: &str) -> scholarbot_shared::Result<()> {
        self.spinner.set_message(text.to_string());
        Ok(())
    }
}
