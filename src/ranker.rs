use std::cmp::Ordering;
use std::collections::HashMap;

/// Score used for any raw score that cannot be read as a number.
pub const SENTINEL_SCORE: f64 = -100.0;

/// Word → raw score mapping that remembers first-insertion order.
///
/// Re-inserting a word replaces its score but keeps its original position.
#[derive(Debug, Default, Clone)]
pub struct WordScores {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl WordScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: String, raw_score: String) {
        match self.index.get(&word) {
            Some(&pos) => self.entries[pos].1 = raw_score,
            None => {
                self.index.insert(word.clone(), self.entries.len());
                self.entries.push((word, raw_score));
            }
        }
    }

    pub fn get(&self, word: &str) -> Option<&str> {
        self.index.get(word).map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(w, s)| (w.as_str(), s.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub word: String,
    pub raw_score: String,
    pub score: f64,
}

/// Reads a raw score such as `"73%"` as a number, falling back to the sentinel.
pub fn normalize_score(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => SENTINEL_SCORE,
    }
}

/// Ranks all scored words, highest first. Equal scores keep insertion order.
pub fn rank(scores: &WordScores) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = scores
        .iter()
        .map(|(word, raw)| RankedEntry {
            word: word.to_string(),
            raw_score: raw.to_string(),
            score: normalize_score(raw),
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked
}
