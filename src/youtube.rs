use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub user_agent: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub page_size: u32,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            user_agent: format!("yt-comment-lens/{}", crate::VERSION),
            base_url: None,
            timeout: Duration::from_secs(20),
            page_size: MAX_PAGE_SIZE,
            http_client: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("youtube: request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("youtube: api error {code} ({reason}): {message}\n{payload}")]
    Api {
        code: u16,
        reason: String,
        message: String,
        payload: String,
    },
    #[error("youtube: http {status}: {body}")]
    Status { status: u16, body: String },
    #[error("youtube: decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("youtube: bad request url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn reason(&self) -> Option<&str> {
        match self {
            ApiError::Api { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub published_at: DateTime<Utc>,
}

/// One page of `commentThreads.list`.
#[derive(Debug, Clone)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub next_page_token: Option<String>,
}

pub struct Client {
    http: HttpClient,
    api_key: String,
    user_agent: String,
    base_url: Url,
    page_size: u32,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            bail!("youtube client api key required");
        }
        if config.user_agent.trim().is_empty() {
            bail!("youtube client user agent required");
        }
        let mut base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder().timeout(config.timeout).build()?,
        };

        Ok(Client {
            http,
            api_key: config.api_key.trim().to_string(),
            user_agent: config.user_agent,
            base_url,
            page_size: config.page_size.clamp(1, MAX_PAGE_SIZE),
        })
    }

    pub fn comment_threads(
        &self,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, ApiError> {
        let mut url = self.base_url.join("commentThreads")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("part", "snippet")
                .append_pair("videoId", video_id)
                .append_pair("maxResults", &self.page_size.to_string())
                .append_pair("textFormat", "plainText")
                .append_pair("key", &self.api_key);
            if let Some(token) = page_token {
                pairs.append_pair("pageToken", token);
            }
        }

        let resp = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), body));
        }

        let payload: ThreadListResponse = serde_json::from_str(&body)?;
        Ok(payload.into_page())
    }
}

fn error_from_body(status: u16, body: String) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => {
            let reason = envelope
                .error
                .errors
                .first()
                .map(|detail| detail.reason.clone())
                .filter(|reason| !reason.is_empty())
                .unwrap_or_else(|| "unknown".to_string());
            ApiError::Api {
                code: envelope.error.code.unwrap_or(status),
                reason,
                message: envelope.error.message,
                payload: body,
            }
        }
        Err(_) => ApiError::Status { status, body },
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl ThreadListResponse {
    fn into_page(self) -> CommentPage {
        CommentPage {
            comments: self
                .items
                .into_iter()
                .map(|thread| {
                    let snippet = thread.snippet.top_level_comment.snippet;
                    Comment {
                        text: snippet.text_display,
                        published_at: snippet.published_at,
                    }
                })
                .collect(),
            next_page_token: self.next_page_token.filter(|token| !token.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_display: String,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}
