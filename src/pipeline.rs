use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::data::{self, CommentService};
use crate::frequency::{FrequencyTable, RankedEntry};
use crate::render::{self, charts, wordcloud, Font, FontError, RenderOptions};
use crate::sentiment::{self, LazyModel, ModelKind, SentimentResult};
use crate::timeline::{HourCount, HourHistogram};
use crate::tokenize::{TokenCache, TokenizerKind};
use crate::video_id;
use crate::youtube::ApiError;

pub const WORDCLOUD_FILE: &str = "wordcloud.png";
pub const TOP_WORDS_FILE: &str = "top_words.png";
pub const HOURLY_FILE: &str = "hourly.png";
pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("could not find a video id in {0:?}; expected a youtube.com/watch?v= or youtu.be/ link")]
    InvalidUrl(String),
    #[error("an API key is required (pass --api-key or set YTCL_API__KEY)")]
    MissingApiKey,
    #[error("collecting comments failed: {0}")]
    Collect(#[from] ApiError),
    #[error("cannot create output directory {}: {source}", path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub tokenizer: TokenizerKind,
    pub top_n: usize,
    pub render: RenderOptions,
    pub font_path: Option<PathBuf>,
    pub sentiment_enabled: bool,
    pub sentiment_sample: usize,
    pub sentiment_model: ModelKind,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerKind::default(),
            top_n: 20,
            render: RenderOptions::default(),
            font_path: None,
            sentiment_enabled: true,
            sentiment_sample: sentiment::DEFAULT_SAMPLE_SIZE,
            sentiment_model: ModelKind::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub url: String,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    NoComments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionStatus {
    Written { path: PathBuf },
    Done,
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: &'static str,
    #[serde(flatten)]
    pub status: SectionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub video_id: String,
    pub url: String,
    pub outcome: Outcome,
    pub pages: usize,
    pub comment_count: usize,
    pub token_count: u64,
    pub distinct_tokens: usize,
    pub top_words: Vec<RankedEntry>,
    pub hourly: Vec<HourCount>,
    pub sentiment: Option<Vec<SentimentResult>>,
    pub sections: Vec<Section>,
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub output_dir: Option<PathBuf>,
}

impl Report {
    fn new(video_id: String) -> Self {
        Report {
            url: video_id::watch_url(&video_id),
            video_id,
            outcome: Outcome::NoComments,
            pages: 0,
            comment_count: 0,
            token_count: 0,
            distinct_tokens: 0,
            top_words: Vec::new(),
            hourly: Vec::new(),
            sentiment: None,
            sections: Vec::new(),
            warnings: Vec::new(),
            output_dir: None,
        }
    }

    pub fn section(&self, name: &str) -> Option<&SectionStatus> {
        self.sections
            .iter()
            .find(|section| section.name == name)
            .map(|section| &section.status)
    }

    pub fn has_failures(&self) -> bool {
        self.sections
            .iter()
            .any(|section| matches!(section.status, SectionStatus::Failed { .. }))
    }

    fn record(&mut self, name: &'static str, status: SectionStatus) {
        match &status {
            SectionStatus::Failed { error } => warn!(section = name, %error, "section failed"),
            SectionStatus::Skipped { reason } => info!(section = name, %reason, "section skipped"),
            _ => {}
        }
        self.sections.push(Section { name, status });
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Font for the word cloud, and for chart text. A malformed configured font
/// fails the word cloud while the charts still get the bundled one.
struct Fonts {
    cloud: Result<Font, FontError>,
    charts: Option<Font>,
}

/// Runs collect, tokenize, aggregate, render and score for one URL. Holds the
/// token cache and the lazily built sentiment model so repeated runs in one
/// process reuse them.
pub struct Pipeline {
    settings: Settings,
    tokens: TokenCache,
    model: LazyModel,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        let model = LazyModel::new(settings.sentiment_model);
        Self::with_model(settings, model)
    }

    pub fn with_model(settings: Settings, model: LazyModel) -> Self {
        Self {
            settings,
            tokens: TokenCache::new(),
            model,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.tokens
    }

    pub fn model(&self) -> &LazyModel {
        &self.model
    }

    pub fn run(
        &self,
        service: &dyn CommentService,
        request: &RunRequest,
    ) -> Result<Report, PipelineError> {
        let video_id = video_id::extract(&request.url)
            .ok_or_else(|| PipelineError::InvalidUrl(request.url.clone()))?;
        let mut report = Report::new(video_id.clone());

        let collection = data::collect_comments(service, &video_id)?;
        report.pages = collection.pages;
        report.comment_count = collection.comments.len();
        info!(
            video_id = %video_id,
            comments = report.comment_count,
            pages = report.pages,
            "collected comments"
        );
        if collection.comments.is_empty() {
            info!(video_id = %video_id, "no comments; nothing to render");
            return Ok(report);
        }
        report.outcome = Outcome::Completed;

        let dir = request.out_dir.join(&video_id);
        fs::create_dir_all(&dir).map_err(|source| PipelineError::Output {
            path: dir.clone(),
            source,
        })?;
        report.output_dir = Some(dir.clone());

        let texts: Vec<&str> = collection.comments.iter().map(|c| c.text.as_str()).collect();
        let tokenizer = self.settings.tokenizer.build();
        let tokens = self.tokens.tokenize(tokenizer.as_ref(), &texts);
        let table = FrequencyTable::from_tokens(tokens.iter());
        report.token_count = table.total();
        report.distinct_tokens = table.len();
        report.top_words = table.top(self.settings.top_n);

        let histogram =
            HourHistogram::from_timestamps(collection.comments.iter().map(|c| &c.published_at));
        report.hourly = histogram.non_empty();

        let fonts = self.load_fonts(&mut report);
        self.render_wordcloud(&table, &fonts.cloud, &dir, &mut report);
        self.render_charts(&histogram, fonts.charts.as_ref(), &dir, &mut report);

        if self.settings.sentiment_enabled {
            self.score(&texts, &mut report);
        } else {
            report.record(
                "sentiment",
                SectionStatus::Skipped {
                    reason: "disabled".into(),
                },
            );
        }

        let path = dir.join(REPORT_FILE);
        let status = match crate::report::write_json(&report, &path) {
            Ok(()) => SectionStatus::Written { path },
            Err(err) => SectionStatus::Failed {
                error: format!("{err:#}"),
            },
        };
        report.record("report", status);
        Ok(report)
    }

    fn load_fonts(&self, report: &mut Report) -> Fonts {
        let configured = match self.settings.font_path.as_deref() {
            Some(path) => render::font::load(path),
            None => Err(FontError::Missing(PathBuf::new())),
        };
        match configured {
            Ok(font) => {
                info!(path = %font.path().display(), "using font");
                Fonts {
                    charts: Some(font.clone()),
                    cloud: Ok(font),
                }
            }
            Err(FontError::Missing(path)) => {
                if path.as_os_str().is_empty() {
                    report.warn("no font configured; using the bundled default font".into());
                } else {
                    report.warn(format!(
                        "font {} not found; using the bundled default font",
                        path.display()
                    ));
                }
                let fallback = self.bundled_font(report);
                Fonts {
                    charts: fallback.as_ref().ok().cloned(),
                    cloud: fallback,
                }
            }
            Err(err) => {
                report.warn(format!("{err}; charts use the bundled default font"));
                Fonts {
                    charts: self.bundled_font(report).ok(),
                    cloud: Err(err),
                }
            }
        }
    }

    fn bundled_font(&self, report: &mut Report) -> Result<Font, FontError> {
        let font = render::font::bundled();
        if let Err(err) = &font {
            report.warn(format!("bundled font unavailable: {err}; charts drawn without text"));
        }
        font
    }

    fn render_wordcloud(
        &self,
        table: &FrequencyTable,
        font: &Result<Font, FontError>,
        dir: &Path,
        report: &mut Report,
    ) {
        let status = match font {
            Err(err) => SectionStatus::Failed {
                error: err.to_string(),
            },
            Ok(_) if table.is_empty() => SectionStatus::Skipped {
                reason: "no tokens".into(),
            },
            Ok(font) => {
                let path = dir.join(WORDCLOUD_FILE);
                let ranked = table.top(self.settings.render.max_words);
                match wordcloud::render(&ranked, font, &self.settings.render, &path) {
                    Ok(0) => SectionStatus::Skipped {
                        reason: "no word fit on the canvas".into(),
                    },
                    Ok(_) => SectionStatus::Written { path },
                    Err(err) => SectionStatus::Failed {
                        error: format!("{err:#}"),
                    },
                }
            }
        };
        report.record("wordcloud", status);
    }

    fn render_charts(
        &self,
        histogram: &HourHistogram,
        font: Option<&Font>,
        dir: &Path,
        report: &mut Report,
    ) {
        let size = (self.settings.render.width, self.settings.render.height);

        let path = dir.join(TOP_WORDS_FILE);
        let status = match charts::top_words(&report.top_words, font, size, &path) {
            Ok(true) => SectionStatus::Written { path },
            Ok(false) => SectionStatus::Skipped {
                reason: "no tokens".into(),
            },
            Err(err) => SectionStatus::Failed {
                error: format!("{err:#}"),
            },
        };
        report.record("top_words", status);

        let path = dir.join(HOURLY_FILE);
        let status = match charts::hourly(histogram, font, size, &path) {
            Ok(()) => SectionStatus::Written { path },
            Err(err) => SectionStatus::Failed {
                error: format!("{err:#}"),
            },
        };
        report.record("hourly", status);
    }

    fn score(&self, texts: &[&str], report: &mut Report) {
        let scored = self.model.get().and_then(|model| {
            sentiment::score_sample(model.as_ref(), texts, self.settings.sentiment_sample)
        });
        let status = match scored {
            Ok(results) => {
                report.sentiment = Some(results);
                SectionStatus::Done
            }
            Err(err) => SectionStatus::Failed {
                error: format!("{err:#}"),
            },
        };
        report.record("sentiment", status);
    }
}
