use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

/// Tokens shorter than this (in chars) are noise.
pub const MIN_TOKEN_CHARS: usize = 2;

pub trait Tokenizer: Send + Sync {
    /// Raw tokens of one comment, before length filtering.
    fn tokens(&self, text: &str) -> Vec<String>;

    fn name(&self) -> &'static str;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    Regex,
    #[default]
    Morph,
}

impl TokenizerKind {
    pub fn build(self) -> Arc<dyn Tokenizer> {
        match self {
            TokenizerKind::Regex => Arc::new(RegexTokenizer),
            TokenizerKind::Morph => Arc::new(MorphTokenizer),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "regex" => Some(TokenizerKind::Regex),
            "morph" | "morphological" => Some(TokenizerKind::Morph),
            _ => None,
        }
    }
}

static WORD_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[가-힣A-Za-z0-9]+").expect("word run pattern"));

/// Runs of Hangul syllables, Latin letters and digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexTokenizer;

impl Tokenizer for RegexTokenizer {
    fn tokens(&self, text: &str) -> Vec<String> {
        WORD_RUN
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    fn name(&self) -> &'static str {
        "regex"
    }
}

// Longest first so "에서" wins over "서".
const PARTICLES: &[&str] = &[
    "에서는", "에게서", "으로는", "이라고", "까지", "부터", "에서", "에게", "한테", "께서", "으로",
    "이랑", "처럼", "보다", "하고", "라고", "은", "는", "이", "가", "을", "를", "의", "에", "로",
    "와", "과", "도", "만", "랑",
];

/// Unicode word segmentation with trailing Korean particles removed, so
/// "맛집이" and "맛집을" both count as "맛집".
#[derive(Debug, Clone, Copy, Default)]
pub struct MorphTokenizer;

impl MorphTokenizer {
    fn strip_particle(word: &str) -> &str {
        for particle in PARTICLES {
            if let Some(stem) = word.strip_suffix(particle) {
                let stem_chars = stem.chars().count();
                if stem_chars >= MIN_TOKEN_CHARS && stem.chars().last().is_some_and(is_hangul) {
                    return stem;
                }
            }
        }
        word
    }
}

impl Tokenizer for MorphTokenizer {
    fn tokens(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(|word| Self::strip_particle(word).to_lowercase())
            .collect()
    }

    fn name(&self) -> &'static str {
        "morph"
    }
}

fn is_hangul(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Tokenizes every comment and keeps tokens of at least two characters, in
/// comment order.
pub fn tokenize_all<S: AsRef<str>>(tokenizer: &dyn Tokenizer, comments: &[S]) -> Vec<String> {
    comments
        .iter()
        .flat_map(|comment| tokenizer.tokens(comment.as_ref()))
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .collect()
}

/// Memoizes `tokenize_all` by a digest of the tokenizer name and the exact
/// comment texts.
#[derive(Default)]
pub struct TokenCache {
    entries: Mutex<HashMap<String, Arc<Vec<String>>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokenize<S: AsRef<str>>(
        &self,
        tokenizer: &dyn Tokenizer,
        comments: &[S],
    ) -> Arc<Vec<String>> {
        let key = cache_key(tokenizer.name(), comments);
        if let Some(hit) = self.entries.lock().get(&key) {
            return hit.clone();
        }
        let tokens = Arc::new(tokenize_all(tokenizer, comments));
        self.entries.lock().insert(key, tokens.clone());
        tokens
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

fn cache_key<S: AsRef<str>>(name: &str, comments: &[S]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    for comment in comments {
        let text = comment.as_ref();
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_splits_hangul_and_latin() {
        let tokens = RegexTokenizer.tokens("Rust는 최고!! 100% 맞아ㅋㅋ");
        assert_eq!(tokens, ["rust는", "최고", "100", "맞아"]);
    }

    #[test]
    fn morph_strips_particles() {
        let tokens = MorphTokenizer.tokens("맛집이 정말 맛집을 찾았다. 서울에서 먹었어요");
        assert_eq!(tokens, ["맛집", "정말", "맛집", "찾았다", "서울", "먹었어요"]);
    }

    #[test]
    fn morph_keeps_short_stems() {
        // "나이" would become "나" which is below the minimum length.
        assert_eq!(MorphTokenizer.tokens("나이"), ["나이"]);
        assert_eq!(MorphTokenizer.tokens("Good video"), ["good", "video"]);
    }

    #[test]
    fn filters_single_character_tokens() {
        for kind in [TokenizerKind::Regex, TokenizerKind::Morph] {
            let tokenizer = kind.build();
            let tokens = tokenize_all(tokenizer.as_ref(), &["a 집 good 맛 네 ok", "I x"]);
            assert!(tokens.iter().all(|t| t.chars().count() >= 2), "{kind:?}");
            assert_eq!(tokens, ["good", "ok"], "{kind:?}");
        }
    }

    #[test]
    fn korean_sample_counts() {
        for kind in [TokenizerKind::Regex, TokenizerKind::Morph] {
            let tokens = tokenize_all(kind.build().as_ref(), &["맛집 맛집 좋다", "좋다 좋다"]);
            assert_eq!(tokens.iter().filter(|t| *t == "맛집").count(), 2);
            assert_eq!(tokens.iter().filter(|t| *t == "좋다").count(), 3);
            assert_eq!(tokens.len(), 5);
        }
    }

    #[test]
    fn longer_comment_never_yields_fewer_raw_tokens() {
        let short = "좋은 영상";
        let long = "좋은 영상 감사합니다 다음 편도 기대할게요";
        for kind in [TokenizerKind::Regex, TokenizerKind::Morph] {
            let tokenizer = kind.build();
            assert!(tokenizer.tokens(long).len() >= tokenizer.tokens(short).len());
        }
    }

    #[test]
    fn parses_kind_names() {
        assert_eq!(TokenizerKind::parse("REGEX"), Some(TokenizerKind::Regex));
        assert_eq!(TokenizerKind::parse("morphological"), Some(TokenizerKind::Morph));
        assert_eq!(TokenizerKind::parse("okt"), None);
    }

    #[test]
    fn cache_reuses_results_for_same_input() {
        let cache = TokenCache::new();
        let comments = vec!["맛집 맛집 좋다".to_string(), "좋다 좋다".to_string()];
        let first = cache.tokenize(&MorphTokenizer, &comments);
        let second = cache.tokenize(&MorphTokenizer, &comments);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let _ = cache.tokenize(&RegexTokenizer, &comments);
        assert_eq!(cache.len(), 2);

        let _ = cache.tokenize(&MorphTokenizer, &["맛집 맛집", "좋다 좋다 좋다"]);
        assert_eq!(cache.len(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }
}
