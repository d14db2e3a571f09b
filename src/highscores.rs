//! High score tables
//!
//! One append-only text file per level, named `scores <level>`, holding one
//! `name:<name>,scores:<score>` line per finished run. The top ten are
//! computed on read.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub name: String,
    pub score: u64,
}

impl HighScoreEntry {
    /// Parse a `name:<name>,scores:<score>` line
    pub fn parse(line: &str) -> Option<Self> {
        let (name_part, score_part) = line.trim().rsplit_once(',')?;
        let name = name_part.strip_prefix("name:")?.trim();
        let score = score_part.split_once(':')?.1.trim().parse().ok()?;
        Some(Self {
            name: name.to_string(),
            score,
        })
    }

    pub fn to_line(&self) -> String {
        format!("name:{},scores:{}", self.name, self.score)
    }
}

/// Leaderboard for one level
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Add a score, keeping each name's best only
    ///
    /// Returns the rank achieved (1-indexed) or None if it didn't make the table.
    pub fn add_score(&mut self, name: &str, score: u64) -> Option<usize> {
        if let Some(i) = self.entries.iter().position(|e| e.name == name) {
            if self.entries[i].score >= score {
                return None;
            }
            self.entries.remove(i);
        }
        if !self.qualifies(score) {
            return None;
        }

        let entry = HighScoreEntry {
            name: name.to_string(),
            score,
        };

        // Sorted descending by score, ties keep arrival order
        let pos = self.entries.iter().position(|e| score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }
}

/// Score files for every level, kept in one directory
#[derive(Debug, Clone)]
pub struct ScoreBook {
    dir: PathBuf,
}

impl ScoreBook {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Score file for a level
    pub fn path_for(&self, level: &str) -> PathBuf {
        self.dir.join(format!("scores {}", level))
    }

    /// Append a finished run to the level's score file
    pub fn record(&self, level: &str, name: &str, score: u64) -> Result<()> {
        let path = self.path_for(level);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        let entry = HighScoreEntry {
            name: name.to_string(),
            score,
        };
        writeln!(file, "{}", entry.to_line())
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Recorded {} for {} on {}", score, name, level);
        Ok(())
    }

    /// Best ten runs for a level (empty when nothing was recorded yet)
    pub fn top_ten(&self, level: &str) -> Result<HighScores> {
        let path = self.path_for(level);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HighScores::new()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };

        let mut scores = HighScores::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            match HighScoreEntry::parse(line) {
                Some(entry) => {
                    scores.add_score(&entry.name, entry.score);
                }
                None => log::warn!("skipping malformed score line in {}: {:?}", path.display(), line),
            }
        }
        Ok(scores)
    }
}
