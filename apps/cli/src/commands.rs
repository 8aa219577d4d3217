//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sitebrief_core::{
    ApiResponse, BriefPipeline, BriefResponse, CrawlStarted, PipelineConfig, ProgressReporter,
    Stage, respond,
};
use sitebrief_shared::{AppConfig, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SiteBrief: turn a website into a citation-backed business brief.
#[derive(Parser)]
#[command(
    name = "sitebrief",
    version,
    about = "Crawl a website and turn it into a structured, citation-backed brief.",
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
    /// Start a crawl job for a site.
    Start {
        /// Site URL; `https://` is assumed when no scheme is given.
        url: String,

        /// What the brief should focus on.
        #[arg(short, long)]
        goal: Option<String>,
    },

    /// Check a crawl job, and optionally extract its brief.
    Status {
        /// Crawl job ID returned by `start`.
        job_id: String,

        /// What the brief should focus on.
        #[arg(short, long)]
        goal: Option<String>,

        /// Produce the brief once the crawl has completed.
        #[arg(long)]
        extract: bool,
    },

    /// Start a crawl, wait for it, and extract the brief.
    Run {
        /// Site URL; `https://` is assumed when no scheme is given.
        url: String,

        /// What the brief should focus on.
        #[arg(short, long)]
        goal: Option<String>,

        /// Seconds between status checks.
        #[arg(long, default_value = "5")]
        poll_interval_secs: u64,

        /// Give up after this many status checks.
        #[arg(long, default_value = "120")]
        max_polls: u32,

        /// Write the JSON response to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
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

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout
/// carries only JSON responses.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitebrief=info",
        1 => "sitebrief=debug",
        _ => "sitebrief=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
        Command::Start { url, goal } => cmd_start(&url, goal.as_deref()).await,
        Command::Status {
            job_id,
            goal,
            extract,
        } => cmd_status(&job_id, goal.as_deref(), extract).await,
        Command::Run {
            url,
            goal,
            poll_interval_secs,
            max_polls,
            out,
        } => {
            cmd_run(
                &url,
                goal.as_deref(),
                Duration::from_secs(poll_interval_secs),
                max_polls,
                out.as_deref(),
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Load configuration, resolve API keys, and build the pipeline.
fn build_pipeline() -> Result<BriefPipeline> {
    let config = load_config()?;
    let pipeline_config = PipelineConfig::from_app_config(&config)?;
    Ok(BriefPipeline::new(pipeline_config)?)
}

/// Print (or write) the response body; a failure response is an error exit.
fn emit(response: &ApiResponse, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(&response.body)?;
    match out {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))
                .map_err(|e| eyre!("cannot write '{}': {e}", path.display()))?;
            info!(path = %path.display(), "response written");
        }
        None => println!("{text}"),
    }

    if response.is_success() {
        Ok(())
    } else {
        Err(eyre!("request failed with status {}", response.status))
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_start(url: &str, goal: Option<&str>) -> Result<()> {
    let pipeline = build_pipeline()?;
    info!(url, "starting crawl");
    let response = respond(pipeline.start_crawl(url, goal).await);
    emit(&response, None)
}

async fn cmd_status(job_id: &str, goal: Option<&str>, extract: bool) -> Result<()> {
    let pipeline = build_pipeline()?;
    let reporter = CliProgress::new();
    let result = pipeline
        .get_status_or_brief(job_id, goal, extract, &reporter)
        .await;
    reporter.finish();
    emit(&respond(result), None)
}

async fn cmd_run(
    url: &str,
    goal: Option<&str>,
    poll_interval: Duration,
    max_polls: u32,
    out: Option<&Path>,
) -> Result<()> {
    let pipeline = build_pipeline()?;
    let reporter = CliProgress::new();

    reporter.spinner.set_message("Starting crawl");
    let started = match pipeline.start_crawl(url, goal).await {
        Ok(started) => started,
        Err(e) => {
            reporter.finish();
            return emit(&respond::<CrawlStarted>(Err(e)), out);
        }
    };
    info!(job_id = %started.job_id, goal = %started.goal, limit = started.limit, "crawl started");

    for poll in 1..=max_polls {
        let result = pipeline
            .get_status_or_brief(&started.job_id, Some(started.goal.as_str()), true, &reporter)
            .await;

        if matches!(result, Ok(BriefResponse::Progress(_))) {
            info!(poll, max_polls, "crawl not finished, waiting");
            tokio::time::sleep(poll_interval).await;
            continue;
        }

        reporter.finish();
        return emit(&respond(result), out);
    }

    reporter.finish();
    Err(eyre!(
        "crawl {} did not complete after {max_polls} status checks; resume with `sitebrief status {} --extract`",
        started.job_id,
        started.job_id
    ))
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
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        let mut name = stage.to_string();
        if let Some(first) = name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        self.spinner.set_message(name);
    }

    fn pages_collected(&self, pages: usize, requests: u32) {
        self.spinner
            .set_message(format!("Collected {pages} pages ({requests} extra requests)"));
    }

    fn done(&self, response: &BriefResponse) {
        if let BriefResponse::Progress(snapshot) = response {
            self.spinner.set_message(format!(
                "Crawling [{}/{}] {}",
                snapshot.completed, snapshot.total, snapshot.status
            ));
        }
    }
}
