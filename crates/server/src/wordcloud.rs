//! Keyword word clouds for analyzed submissions.
//!
//! Purely cosmetic: the image is rendered by a QuickChart-compatible
//! service after the verdict exists, and any failure is reported as a
//! warning next to the verdict.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::WordCloudConfig;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // English
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "is", "are",
        "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
        "could", "should", "may", "might", "can", "this", "that", "these", "those", "i", "you",
        "he", "she", "it", "we", "they",
        // Russian
        "что", "это", "как", "то", "все", "если", "он", "она", "они", "мы", "вы", "я", "и",
        "или", "но", "не", "да", "нет", "в", "на", "за", "по", "от", "с",
    ]
    .into_iter()
    .collect()
});

fn is_word_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || ('а'..='я').contains(&c)
}

/// Most frequent keywords in `text`, at most `limit`, most frequent first.
///
/// Text is lowercased and every character outside `a-z`, `а-я` and `0-9`
/// becomes a separator. Stop words and words of two characters or fewer are
/// dropped. Equal counts are ordered alphabetically.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<(String, usize)> {
    let lowered = text.to_lowercase();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in lowered.split(|c: char| !is_word_char(c)) {
        if word.chars().count() > 2 && !STOP_WORDS.contains(word) {
            *counts.entry(word).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(word, count)| (word.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

#[derive(Debug, Error)]
pub enum WordCloudError {
    #[error("no keywords to render")]
    NoKeywords,
    #[error("word cloud request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("word cloud service answered {0}")]
    Status(u16),
}

/// Client for the word-cloud renderer.
#[derive(Debug, Clone)]
pub struct WordCloudClient {
    client: reqwest::Client,
    url: String,
    width: u32,
    height: u32,
    max_keywords: usize,
}

impl WordCloudClient {
    pub fn from_config(cfg: &WordCloudConfig) -> Result<Self, WordCloudError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: cfg.url.clone(),
            width: cfg.width,
            height: cfg.height,
            max_keywords: cfg.max_keywords,
        })
    }

    /// Renders the keywords of `text` as a PNG.
    pub async fn render(&self, text: &str) -> Result<Vec<u8>, WordCloudError> {
        let keywords = extract_keywords(text, self.max_keywords);
        if keywords.is_empty() {
            return Err(WordCloudError::NoKeywords);
        }
        let words = keywords
            .iter()
            .map(|(word, _)| word.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        debug!(keywords = keywords.len(), "requesting word cloud");

        let width = self.width.to_string();
        let height = self.height.to_string();
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("text", words.as_str()),
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("format", "png"),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(WordCloudError::Status(resp.status().as_u16()));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}
