mod display;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use lexaudit_ai::{
    AuditConfig, AuditInvoker, GeminiClient, GeminiConfig, OcrBridge, OcrConfig, TextExtractor,
};
use lexaudit_core::{LawQuery, Rubric};
use lexaudit_pipeline::{Auditor, Components, OcrStrategy, PipelineConfig, PipelineError};
use lexaudit_source::{
    ConsultationConfig, ConsultationFinder, GoogleSearch, HttpConfig, HttpFetcher, LawLocator,
    LocatorConfig, LocatorStrategy, ParliamentClient,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lexaudit", version)]
#[command(about = "Audit Hellenic Parliament legislation against a good-lawmaking rubric")]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Locate a law, gather its documents and audit them
    Audit(AuditArgs),
    /// Locate a law and list its documents
    Locate(LocateArgs),
}

#[derive(Args)]
struct LocateArgs {
    /// Law number ("4940/2022") or a title fragment
    #[arg(required_unless_present = "url")]
    query: Option<String>,

    /// Parliament law page to scrape when the API has nothing
    #[arg(long)]
    url: Option<String>,

    #[arg(long, value_enum, default_value_t = Locator::Api)]
    locator: Locator,

    /// Per-request HTTP timeout, seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[derive(Args)]
struct AuditArgs {
    #[command(flatten)]
    locate: LocateArgs,

    /// Write the full report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rubric JSON file (defaults to the built-in ten-point checklist)
    #[arg(long)]
    rubric: Option<PathBuf>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, env = "LEXAUDIT_MODEL", default_value = "gemini-2.0-flash")]
    model: String,

    #[arg(
        long,
        env = "LEXAUDIT_FALLBACK_MODEL",
        default_value = "gemini-2.0-flash-exp"
    )]
    fallback_model: String,

    /// Do not retry on the fallback model
    #[arg(long)]
    no_fallback: bool,

    #[arg(long, value_enum, default_value_t = Ocr::Transcribe)]
    ocr: Ocr,

    /// Documents processed at once
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Give up on the whole request after this many seconds
    #[arg(long)]
    deadline: Option<u64>,

    /// Read at most this many pages per PDF
    #[arg(long)]
    max_pages: Option<usize>,

    /// Per-category evidence cap, characters
    #[arg(long, default_value_t = lexaudit_core::DEFAULT_MAX_CATEGORY_CHARS)]
    max_category_chars: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Locator {
    /// Parliament API first, then the --url page
    Api,
    /// The --url page first, then the API
    Scrape,
}

impl From<Locator> for LocatorStrategy {
    fn from(l: Locator) -> Self {
        match l {
            Locator::Api => LocatorStrategy::ApiFirst,
            Locator::Scrape => LocatorStrategy::ScrapeFirst,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Ocr {
    /// Transcribe scans before the audit
    Transcribe,
    /// Attach scans to the audit request
    Attach,
}

impl From<Ocr> for OcrStrategy {
    fn from(o: Ocr) -> Self {
        match o {
            Ocr::Transcribe => OcrStrategy::Transcribe,
            Ocr::Attach => OcrStrategy::AttachToAudit,
        }
    }
}

impl LocateArgs {
    fn query(&self) -> Option<LawQuery> {
        self.query.as_deref().and_then(LawQuery::parse)
    }

    fn http_config(&self) -> HttpConfig {
        HttpConfig::default().with_timeout(Duration::from_secs(self.timeout))
    }

    fn build_locator(&self, fetcher: Arc<HttpFetcher>) -> anyhow::Result<LawLocator> {
        let api = ParliamentClient::new(&self.http_config()).context("building API client")?;
        Ok(LawLocator::new(
            Arc::new(api),
            fetcher,
            LocatorConfig {
                strategy: self.locator.into(),
            },
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("lexaudit v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Locate(args) => locate(args).await,
        Command::Audit(args) => audit(args).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn locate(args: LocateArgs) -> anyhow::Result<ExitCode> {
    let fetcher = Arc::new(HttpFetcher::new(&args.http_config()).context("building HTTP client")?);
    let locator = args.build_locator(fetcher)?;

    match locator.locate(args.query().as_ref(), args.url.as_deref()).await {
        Ok(record) => {
            display::print_law_card(&record);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_failure(&PipelineError::from(e));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn audit(args: AuditArgs) -> anyhow::Result<ExitCode> {
    let rubric = match &args.rubric {
        Some(path) => Rubric::load(path)
            .with_context(|| format!("loading rubric {}", path.display()))?,
        None => Rubric::default(),
    };

    let http = args.locate.http_config();
    let fetcher = Arc::new(HttpFetcher::new(&http).context("building HTTP client")?);
    let search = GoogleSearch::new(&http).context("building search client")?;
    let gemini = Arc::new(
        GeminiClient::new(GeminiConfig::new(args.api_key.clone()))
            .context("building Gemini client")?,
    );

    let mut extractor = TextExtractor::new();
    if let Some(pages) = args.max_pages {
        extractor = extractor.with_max_pages(pages);
    }

    let parts = Components {
        locator: args.locate.build_locator(fetcher.clone())?,
        documents: fetcher.clone(),
        extractor,
        ocr: OcrBridge::new(
            gemini.clone(),
            OcrConfig {
                model: args.model.clone(),
                ..OcrConfig::default()
            },
        ),
        consultations: ConsultationFinder::new(
            Arc::new(search),
            fetcher,
            ConsultationConfig::default(),
        ),
        invoker: AuditInvoker::new(
            gemini,
            AuditConfig {
                primary_model: args.model.clone(),
                fallback_model: (!args.no_fallback).then(|| args.fallback_model.clone()),
                ..AuditConfig::default()
            },
        ),
    };
    let config = PipelineConfig {
        concurrency: args.concurrency,
        ocr_strategy: args.ocr.into(),
        deadline: args.deadline.map(Duration::from_secs),
        max_category_chars: args.max_category_chars,
    };
    let auditor = Auditor::new(parts, rubric, config);

    let query = args.locate.query();
    let report = match auditor.run(query.as_ref(), args.locate.url.as_deref()).await {
        Ok(report) => report,
        Err(e) => {
            report_failure(&e);
            return Ok(ExitCode::FAILURE);
        }
    };

    display::print_verdict_card(&report, auditor.rubric());

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Report written to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn report_failure(e: &PipelineError) {
    eprintln!("Failed at {}: {e}", e.stage());
    if let Some(hint) = e.hint() {
        eprintln!("  hint: {hint}");
    }
    if let Some(raw) = e.raw_response() {
        let preview: String = raw.chars().take(500).collect();
        eprintln!("  raw model response:\n{preview}");
    }
}
