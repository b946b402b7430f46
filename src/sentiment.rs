use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use unicode_segmentation::UnicodeSegmentation;

/// Comments past this index are never scored.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    pub comment: String,
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

pub trait SentimentModel: Send + Sync {
    /// One prediction per input, in input order.
    fn classify(&self, texts: &[&str]) -> Result<Vec<Prediction>>;

    fn name(&self) -> &'static str;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Lexicon,
    Bert,
}

impl ModelKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lexicon" => Some(ModelKind::Lexicon),
            "bert" => Some(ModelKind::Bert),
            _ => None,
        }
    }
}

pub fn build_model(kind: ModelKind) -> Result<Arc<dyn SentimentModel>> {
    match kind {
        ModelKind::Lexicon => Ok(Arc::new(LexiconModel)),
        #[cfg(feature = "bert")]
        ModelKind::Bert => Ok(Arc::new(bert::BertModel::load()?)),
        #[cfg(not(feature = "bert"))]
        ModelKind::Bert => {
            anyhow::bail!("sentiment: the bert model needs a build with `--features bert`")
        }
    }
}

type Factory = Box<dyn Fn() -> Result<Arc<dyn SentimentModel>> + Send + Sync>;

/// Builds the model on first use and hands out the same instance afterwards.
/// A failed build is not cached, so the next run retries.
pub struct LazyModel {
    factory: Factory,
    cell: OnceCell<Arc<dyn SentimentModel>>,
}

impl LazyModel {
    pub fn new(kind: ModelKind) -> Self {
        Self::with_factory(move || build_model(kind))
    }

    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn SentimentModel>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Result<Arc<dyn SentimentModel>> {
        self.cell
            .get_or_try_init(|| {
                let model = (self.factory)().context("load sentiment model")?;
                info!(model = model.name(), "sentiment model ready");
                Ok(model)
            })
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Scores the first `limit` comments.
pub fn score_sample<S: AsRef<str>>(
    model: &dyn SentimentModel,
    comments: &[S],
    limit: usize,
) -> Result<Vec<SentimentResult>> {
    let sample: Vec<&str> = comments.iter().take(limit).map(|c| c.as_ref()).collect();
    if sample.is_empty() {
        return Ok(Vec::new());
    }
    let predictions = model.classify(&sample)?;
    anyhow::ensure!(
        predictions.len() == sample.len(),
        "sentiment: model returned {} predictions for {} comments",
        predictions.len(),
        sample.len()
    );
    Ok(sample
        .into_iter()
        .zip(predictions)
        .map(|(comment, prediction)| SentimentResult {
            comment: comment.to_string(),
            label: prediction.label,
            score: prediction.score,
        })
        .collect())
}

const POSITIVE: &[&str] = &[
    "좋", "최고", "감사", "고맙", "사랑", "재밌", "재미있", "멋지", "멋있", "훌륭", "대박", "행복",
    "기대", "추천", "맛있", "예쁘", "이쁘", "귀엽", "응원", "유익", "짱", "good", "great", "love",
    "awesome", "amazing", "best", "nice", "excellent", "thanks", "thank", "cool", "beautiful",
    "funny", "helpful", "perfect", "like", "wonderful",
];

const NEGATIVE: &[&str] = &[
    "싫", "별로", "최악", "나쁘", "나빠", "실망", "짜증", "노잼", "재미없", "맛없", "지루", "화나",
    "슬프", "아쉽", "거짓", "쓰레기", "불편", "비추", "bad", "worst", "hate", "boring", "terrible",
    "awful", "sad", "disappointing", "disappointed", "poor", "annoying", "fake", "dislike",
    "trash",
];

const NEGATORS: &[&str] = &["안", "못", "not", "no", "never", "don't", "isn't", "wasn't"];

/// Polarity word counts over a built-in Korean/English lexicon. Hangul
/// entries match as stems, Latin entries as whole words; a negator flips the
/// word that follows it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconModel;

impl LexiconModel {
    fn polarity(word: &str) -> i32 {
        let matches = |entry: &&str| {
            if entry.is_ascii() {
                word == *entry
            } else {
                word.starts_with(*entry)
            }
        };
        if NEGATIVE.iter().any(matches) {
            -1
        } else if POSITIVE.iter().any(matches) {
            1
        } else {
            0
        }
    }

    fn predict(text: &str) -> Prediction {
        let mut positive = 0u32;
        let mut negative = 0u32;
        let mut negate = false;
        for word in text.unicode_words().map(str::to_lowercase) {
            if NEGATORS.contains(&word.as_str()) {
                negate = true;
                continue;
            }
            let polarity = match Self::polarity(&word) {
                p if negate => -p,
                p => p,
            };
            negate = false;
            match polarity {
                1 => positive += 1,
                -1 => negative += 1,
                _ => {}
            }
        }

        let hits = (positive + negative) as f32;
        let (label, score) = if positive > negative {
            ("positive", (positive as f32 + 1.0) / (hits + 2.0))
        } else if negative > positive {
            ("negative", (negative as f32 + 1.0) / (hits + 2.0))
        } else {
            ("neutral", 1.0 - hits / (hits + 2.0))
        };
        Prediction {
            label: label.to_string(),
            score,
        }
    }
}

impl SentimentModel for LexiconModel {
    fn classify(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        Ok(texts.iter().map(|text| Self::predict(text)).collect())
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

#[cfg(feature = "bert")]
mod bert {
    use anyhow::{Context, Result};
    use parking_lot::Mutex;
    use rust_bert::pipelines::sentiment::{
        SentimentConfig, SentimentModel as Pipeline, SentimentPolarity,
    };

    use super::{Prediction, SentimentModel};

    pub struct BertModel {
        pipeline: Mutex<Pipeline>,
    }

    impl BertModel {
        pub fn load() -> Result<Self> {
            let pipeline =
                Pipeline::new(SentimentConfig::default()).context("sentiment: load bert pipeline")?;
            Ok(Self {
                pipeline: Mutex::new(pipeline),
            })
        }
    }

    impl SentimentModel for BertModel {
        fn classify(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
            let outputs = self.pipeline.lock().predict(texts);
            Ok(outputs
                .into_iter()
                .map(|sentiment| Prediction {
                    label: match sentiment.polarity {
                        SentimentPolarity::Positive => "positive".to_string(),
                        SentimentPolarity::Negative => "negative".to_string(),
                    },
                    score: sentiment.score as f32,
                })
                .collect())
        }

        fn name(&self) -> &'static str {
            "bert"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn lexicon_labels() {
        let model = LexiconModel;
        let out = model
            .classify(&["영상 너무 좋아요 최고", "진짜 최악 실망", "오늘 날씨", "not good"])
            .unwrap();
        let labels: Vec<_> = out.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["positive", "negative", "neutral", "negative"]);
        assert!(out.iter().all(|p| (0.0..=1.0).contains(&p.score)));
        assert!(out[0].score > out[3].score);
    }

    #[test]
    fn korean_negation_flips() {
        let out = LexiconModel.classify(&["안 좋아요"]).unwrap();
        assert_eq!(out[0].label, "negative");
    }

    #[test]
    fn sample_is_capped() {
        let comments: Vec<String> = (0..250).map(|i| format!("좋다 {i}")).collect();
        let results = score_sample(&LexiconModel, &comments, DEFAULT_SAMPLE_SIZE).unwrap();
        assert_eq!(results.len(), DEFAULT_SAMPLE_SIZE);
        assert_eq!(results[0].comment, "좋다 0");
        assert_eq!(results[99].comment, "좋다 99");
        assert!(score_sample(&LexiconModel, &comments[..0], 100).unwrap().is_empty());
    }

    #[test]
    fn short_inputs_score_everything() {
        let results = score_sample(&LexiconModel, &["good", "bad"], 100).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].label, "negative");
    }

    #[test]
    fn lazy_model_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let lazy = LazyModel::with_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(LexiconModel) as Arc<dyn SentimentModel>)
        });
        assert!(!lazy.is_loaded());
        let first = lazy.get().unwrap();
        let second = lazy.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(lazy.is_loaded());
    }

    #[test]
    fn failed_build_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let lazy = LazyModel::with_factory(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("weights unavailable");
            }
            Ok(Arc::new(LexiconModel) as Arc<dyn SentimentModel>)
        });
        assert!(lazy.get().is_err());
        assert!(lazy.get().is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[cfg(not(feature = "bert"))]
    #[test]
    fn bert_requires_feature() {
        let err = build_model(ModelKind::Bert).err().unwrap();
        assert!(err.to_string().contains("--features bert"));
    }

    #[test]
    fn parses_model_kind() {
        assert_eq!(ModelKind::parse("Lexicon"), Some(ModelKind::Lexicon));
        assert_eq!(ModelKind::parse("bert"), Some(ModelKind::Bert));
        assert_eq!(ModelKind::parse("vader"), None);
    }
}
