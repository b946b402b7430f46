use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::config::{self, Config};
use crate::data::YouTubeCommentService;
use crate::pipeline::{Pipeline, PipelineError, RunRequest, Settings};
use crate::render::RenderOptions;
use crate::report;
use crate::sentiment::ModelKind;
use crate::tokenize::TokenizerKind;
use crate::youtube;

/// Analyzed when no URL and no API key are given on the command line.
pub const SAMPLE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

#[derive(Debug, Parser)]
#[command(
    name = "yt-comment-lens",
    version,
    about = "Word clouds, word frequencies, hourly activity and sentiment for YouTube comments."
)]
pub struct Cli {
    /// Video URLs (youtube.com/watch?v=... or youtu.be/...). Each one is analyzed in turn.
    pub urls: Vec<String>,

    /// YouTube Data API key. Falls back to api.key in the config file or YTCL_API__KEY.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Config file (default: <config dir>/yt-comment-lens/config.yaml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for charts and reports; one subdirectory per video.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub tokenizer: Option<TokenizerKind>,

    /// Number of ranked words to show and chart.
    #[arg(long)]
    pub top: Option<usize>,

    /// Font file used for the word cloud and chart labels.
    #[arg(long)]
    pub font: Option<PathBuf>,

    #[arg(long)]
    pub no_sentiment: bool,

    /// Score at most this many comments.
    #[arg(long)]
    pub sentiment_sample: Option<usize>,

    #[arg(long, value_enum)]
    pub model: Option<ModelKind>,

    /// Store --api-key in the config file.
    #[arg(long, requires = "api_key")]
    pub save_key: bool,

    /// Print each report as JSON instead of tables.
    #[arg(long)]
    pub json: bool,

    #[arg(long, short)]
    pub verbose: bool,
}

/// Runs every requested URL and returns how many runs failed.
pub fn run(cli: Cli) -> Result<usize> {
    let cfg = config::load(config::LoadOptions {
        config_file: cli.config.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    if cli.save_key {
        if let Some(key) = cli.api_key.as_deref() {
            let path = config::save_api_key(cli.config.clone(), key).context("save api key")?;
            info!(path = %path.display(), "saved api key");
            if cli.urls.is_empty() {
                return Ok(0);
            }
        }
    }

    let urls = if cli.urls.is_empty() {
        anyhow::ensure!(
            cli.api_key.is_none(),
            "no video URL given; pass one or more URLs"
        );
        info!(url = SAMPLE_URL, "no URL given; analyzing the sample video");
        vec![SAMPLE_URL.to_string()]
    } else {
        cli.urls.clone()
    };

    let api_key = cli
        .api_key
        .clone()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .unwrap_or_else(|| cfg.api.key.clone());
    if api_key.is_empty() {
        return Err(PipelineError::MissingApiKey.into());
    }

    let client = youtube::Client::new(youtube::ClientConfig {
        api_key,
        user_agent: cfg.api.user_agent.clone(),
        base_url: Some(cfg.api.base_url.clone()),
        timeout: cfg.api.timeout,
        page_size: cfg.api.page_size,
        http_client: None,
    })
    .context("build youtube client")?;
    let service = YouTubeCommentService::new(Arc::new(client));

    let out_dir = cli.out.clone().unwrap_or_else(|| cfg.output.dir.clone());
    let pipeline = Pipeline::new(settings_from(&cfg, &cli));

    let mut failures = 0;
    for url in &urls {
        let spinner = spinner(&format!("analyzing {url}"));
        let result = pipeline.run(
            &service,
            &RunRequest {
                url: url.clone(),
                out_dir: out_dir.clone(),
            },
        );
        spinner.finish_and_clear();

        match result {
            Ok(report) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print!("{}", report::render_text(&report));
                }
                if report.has_failures() {
                    failures += 1;
                }
            }
            Err(err) => {
                error!(%url, "{err}");
                eprintln!("error: {url}: {err}");
                failures += 1;
            }
        }
    }
    Ok(failures)
}

fn settings_from(cfg: &Config, cli: &Cli) -> Settings {
    Settings {
        tokenizer: cli.tokenizer.unwrap_or(cfg.analysis.tokenizer),
        top_n: cli.top.filter(|n| *n > 0).unwrap_or(cfg.analysis.top_n),
        render: RenderOptions {
            width: cfg.render.width,
            height: cfg.render.height,
            max_words: cfg.render.max_words,
            seed: cfg.render.seed,
            ..RenderOptions::default()
        },
        font_path: cli.font.clone().or_else(|| cfg.render.font_path.clone()),
        sentiment_enabled: cfg.sentiment.enabled && !cli.no_sentiment,
        sentiment_sample: cli.sentiment_sample.unwrap_or(cfg.sentiment.sample_size),
        sentiment_model: cli.model.unwrap_or(cfg.sentiment.model),
    }
}

fn spinner(message: &str) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
