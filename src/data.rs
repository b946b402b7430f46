use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::youtube::{self, ApiError, Comment, CommentPage};

pub trait CommentService: Send + Sync {
    fn load_page(&self, video_id: &str, page_token: Option<&str>)
        -> Result<CommentPage, ApiError>;
}

pub struct YouTubeCommentService {
    client: Arc<youtube::Client>,
}

impl YouTubeCommentService {
    pub fn new(client: Arc<youtube::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for YouTubeCommentService {
    fn load_page(
        &self,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, ApiError> {
        self.client.comment_threads(video_id, page_token)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub comments: Vec<Comment>,
    pub pages: usize,
}

/// Walks every page of top-level comments. Any page failure discards what was
/// gathered so far.
pub fn collect_comments(
    service: &dyn CommentService,
    video_id: &str,
) -> Result<Collection, ApiError> {
    let mut collection = Collection::default();
    let mut next: Option<String> = None;

    loop {
        let page = service.load_page(video_id, next.as_deref())?;
        collection.pages += 1;
        debug!(
            video_id,
            page = collection.pages,
            items = page.comments.len(),
            "fetched comment page"
        );
        collection.comments.extend(page.comments);
        match page.next_page_token {
            Some(token) => next = Some(token),
            None => break,
        }
    }

    Ok(collection)
}

/// Serves pre-built pages keyed by page token; the first page uses the empty
/// key. Records every token it was asked for.
#[derive(Default)]
pub struct ScriptedCommentService {
    pages: HashMap<String, CommentPage>,
    failures: HashMap<String, (u16, String)>,
    requests: Mutex<Vec<Option<String>>>,
}

impl ScriptedCommentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, token: &str, page: CommentPage) -> Self {
        self.pages.insert(token.to_string(), page);
        self
    }

    pub fn with_failure(mut self, token: &str, code: u16, reason: &str) -> Self {
        self.failures
            .insert(token.to_string(), (code, reason.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<Option<String>> {
        self.requests.lock().clone()
    }
}

impl CommentService for ScriptedCommentService {
    fn load_page(
        &self,
        _video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, ApiError> {
        self.requests.lock().push(page_token.map(str::to_string));
        let key = page_token.unwrap_or_default();
        if let Some((code, reason)) = self.failures.get(key) {
            return Err(ApiError::Api {
                code: *code,
                reason: reason.clone(),
                message: format!("scripted failure for page {key:?}"),
                payload: String::new(),
            });
        }
        Ok(self.pages.get(key).cloned().unwrap_or(CommentPage {
            comments: Vec::new(),
            next_page_token: None,
        }))
    }
}
