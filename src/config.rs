use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sentiment::{ModelKind, DEFAULT_SAMPLE_SIZE};
use crate::tokenize::TokenizerKind;

const DEFAULT_ENV_PREFIX: &str = "YTCL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            base_url: default_base_url(),
            timeout: default_timeout(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    crate::youtube::DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_page_size() -> u32 {
    crate::youtube::MAX_PAGE_SIZE
}

fn default_user_agent() -> String {
    format!("yt-comment-lens/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub tokenizer: TokenizerKind,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerKind::default(),
            top_n: default_top_n(),
        }
    }
}

fn default_top_n() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    #[serde(default = "default_font_path")]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: default_font_path(),
            width: default_width(),
            height: default_height(),
            max_words: default_max_words(),
            seed: default_seed(),
        }
    }
}

fn default_font_path() -> Option<PathBuf> {
    Some(PathBuf::from(
        "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
    ))
}

/// Largest canvas side in pixels; bigger values are clamped.
pub const MAX_CANVAS_SIDE: u32 = 8192;

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    400
}

fn default_max_words() -> usize {
    200
}

fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default)]
    pub model: ModelKind,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sample_size: default_sample_size(),
            model: ModelKind::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("yt-comment-lens-out")
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            cfg = read_config_file(path)?;
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            cfg = read_config_file(&default_path)?;
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);
    normalize(&mut cfg);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn normalize(cfg: &mut Config) {
    cfg.api.key = cfg.api.key.trim().to_string();
    if cfg.api.page_size == 0 {
        cfg.api.page_size = default_page_size();
    }
    if cfg.analysis.top_n == 0 {
        cfg.analysis.top_n = default_top_n();
    }
    if cfg.render.width == 0 {
        cfg.render.width = default_width();
    }
    if cfg.render.height == 0 {
        cfg.render.height = default_height();
    }
    cfg.render.width = cfg.render.width.min(MAX_CANVAS_SIDE);
    cfg.render.height = cfg.render.height.min(MAX_CANVAS_SIDE);
    if cfg.render
        .font_path
        .as_ref()
        .is_some_and(|p| p.as_os_str().is_empty())
    {
        cfg.render.font_path = None;
    }
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.key" => cfg.api.key = value,
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "api.page_size" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.api.page_size = parsed;
            }
        }
        "analysis.tokenizer" => {
            if let Some(kind) = TokenizerKind::parse(&value) {
                cfg.analysis.tokenizer = kind;
            }
        }
        "analysis.top_n" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.analysis.top_n = parsed;
            }
        }
        "render.font_path" => {
            cfg.render.font_path = if value.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            }
        }
        "render.width" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.render.width = parsed;
            }
        }
        "render.height" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.render.height = parsed;
            }
        }
        "render.max_words" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.render.max_words = parsed;
            }
        }
        "render.seed" => {
            if let Ok(parsed) = value.parse::<u64>() {
                cfg.render.seed = parsed;
            }
        }
        "sentiment.enabled" => {
            cfg.sentiment.enabled = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "sentiment.sample_size" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.sentiment.sample_size = parsed;
            }
        }
        "sentiment.model" => {
            if let Some(kind) = ModelKind::parse(&value) {
                cfg.sentiment.model = kind;
            }
        }
        "output.dir" => cfg.output.dir = PathBuf::from(value),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("yt-comment-lens").join("config.yaml"))
}

/// Stores the API key in the config file, keeping every other setting.
pub fn save_api_key(path: Option<PathBuf>, api_key: &str) -> Result<PathBuf> {
    let api_key = api_key.trim();
    anyhow::ensure!(!api_key.is_empty(), "config: api.key is required");

    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    let mut cfg = if path.exists() {
        read_config_file(&path)?
    } else {
        Config::default()
    };
    cfg.api.key = api_key.to_string();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(&cfg).context("config: failed to serialize config")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}
