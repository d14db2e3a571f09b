//! Game configuration
//!
//! Read once at startup from a plain text file of `==Section==` headers and
//! `key: value` lines:
//!
//! ```text
//! ==World==
//! gravity: 300
//! start: level1.txt
//!
//! ==Player==
//! character: mario
//! x: 30
//! y: 30
//! mass: 100
//! health: 20
//! max_velocity: 100
//!
//! ==level1.txt==
//! goal: level2.txt
//! tunnel: bonus.txt
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Next-level value meaning "there is no next level"
pub const END_OF_GAME: &str = "END";

/// Raw sections and key/value pairs as written in the file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ConfigFile {
    /// Parse config text; malformed lines are skipped with a warning
    pub fn parse(text: &str) -> Self {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut current: Option<String> = None;

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.len() > 4 && line.starts_with("==") && line.ends_with("==") {
                let heading = line[2..line.len() - 2].trim().to_string();
                sections.entry(heading.clone()).or_default();
                current = Some(heading);
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                log::warn!("config line {}: expected `key: value`, skipping", number + 1);
                continue;
            };
            let Some(heading) = &current else {
                log::warn!("config line {}: `{}` is outside any section", number + 1, key.trim());
                continue;
            };
            sections
                .entry(heading.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }

        Self { sections }
    }

    /// Look up `section,key`
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    pub fn require(&self, section: &str, key: &str) -> Result<&str> {
        self.get(section, key)
            .ok_or_else(|| anyhow!("missing config value `{}` in section `{}`", key, section))
    }

    /// Required value parsed into a number or similar
    pub fn parse_value<T>(&self, section: &str, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw = self.require(section, key)?;
        raw.parse()
            .with_context(|| format!("invalid `{}` in section `{}`: {:?}", key, section, raw))
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

/// Player settings from the `Player` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub character: String,
    pub x: f32,
    pub y: f32,
    pub mass: f32,
    pub health: u32,
    pub max_velocity: f32,
}

impl PlayerConfig {
    pub fn spawn(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            character: "mario".to_string(),
            x: 30.0,
            y: 30.0,
            mass: 100.0,
            health: 20,
            max_velocity: 100.0,
        }
    }
}

/// Where a level's goal and tunnel lead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelLinks {
    pub goal: Option<String>,
    pub tunnel: Option<String>,
}

/// Where a goal sends the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Level(String),
    /// Last level finished
    End,
}

/// Typed game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub gravity: f32,
    pub start_level: String,
    pub player: PlayerConfig,
    /// Per-level links, keyed by level name
    pub levels: BTreeMap<String, LevelLinks>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            gravity: 300.0,
            start_level: "level1.txt".to_string(),
            player: PlayerConfig::default(),
            levels: BTreeMap::new(),
        }
    }
}

impl GameConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config =
            Self::from_text(&text).with_context(|| format!("loading config {}", path.display()))?;
        log::info!(
            "Loaded config {} ({} level sections)",
            path.display(),
            config.levels.len()
        );
        Ok(config)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_file(&ConfigFile::parse(text))
    }

    pub fn from_file(file: &ConfigFile) -> Result<Self> {
        let player = PlayerConfig {
            character: file.require("Player", "character")?.to_string(),
            x: file.parse_value("Player", "x")?,
            y: file.parse_value("Player", "y")?,
            mass: file.parse_value("Player", "mass")?,
            health: file.parse_value("Player", "health")?,
            max_velocity: file.parse_value("Player", "max_velocity")?,
        };

        let levels = file
            .sections()
            .filter(|name| !matches!(*name, "World" | "Player"))
            .map(|name| {
                let links = LevelLinks {
                    goal: file.get(name, "goal").map(str::to_string),
                    tunnel: file.get(name, "tunnel").map(str::to_string),
                };
                (name.to_string(), links)
            })
            .collect();

        Ok(Self {
            gravity: file.parse_value("World", "gravity")?,
            start_level: file.require("World", "start")?.to_string(),
            player,
            levels,
        })
    }

    /// Where the goal of `level` leads (no entry means the game ends)
    pub fn goal_destination(&self, level: &str) -> Destination {
        match self.levels.get(level).and_then(|links| links.goal.as_deref()) {
            Some(END_OF_GAME) | None => Destination::End,
            Some(next) => Destination::Level(next.to_string()),
        }
    }

    /// Where the tunnel of `level` leads, if it has one
    pub fn tunnel_destination(&self, level: &str) -> Option<&str> {
        self.levels
            .get(level)
            .and_then(|links| links.tunnel.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
==World==
gravity: 300
start: level1.txt

==Player==
character: luigi
x: 30
y: 40
mass: 100
health: 20
max_velocity: 120

==level1.txt==
goal: level2.txt
tunnel: bonus.txt

==level2.txt==
goal: END
";

    #[test]
    fn test_parse_sample() {
        let config = GameConfig::from_text(SAMPLE).unwrap();
        assert_eq!(config.gravity, 300.0);
        assert_eq!(config.start_level, "level1.txt");
        assert_eq!(config.player.character, "luigi");
        assert_eq!(config.player.spawn(), Vec2::new(30.0, 40.0));
        assert_eq!(config.player.health, 20);
        assert_eq!(config.player.max_velocity, 120.0);
        assert_eq!(config.levels.len(), 2);
    }

    #[test]
    fn test_destinations() {
        let config = GameConfig::from_text(SAMPLE).unwrap();
        assert_eq!(
            config.goal_destination("level1.txt"),
            Destination::Level("level2.txt".into())
        );
        assert_eq!(config.goal_destination("level2.txt"), Destination::End);
        assert_eq!(config.goal_destination("bonus.txt"), Destination::End);
        assert_eq!(config.tunnel_destination("level1.txt"), Some("bonus.txt"));
        assert_eq!(config.tunnel_destination("level2.txt"), None);
    }

    #[test]
    fn test_missing_key_names_section() {
        let text = SAMPLE.replace("mass: 100\n", "");
        let err = GameConfig::from_text(&text).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("mass"));
        assert!(message.contains("Player"));
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let text = SAMPLE.replace("gravity: 300", "gravity: heavy");
        let err = GameConfig::from_text(&text).unwrap_err();
        assert!(format!("{:#}", err).contains("gravity"));
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let file = ConfigFile::parse("stray: value\n==World==\nno colon here\ngravity : 9.5\n");
        assert_eq!(file.get("World", "gravity"), Some("9.5"));
        assert_eq!(file.get("World", "stray"), None);
        assert_eq!(file.sections().count(), 1);
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = GameConfig::load(file.path()).unwrap();
        assert_eq!(config.player.character, "luigi");

        let missing = GameConfig::load("/definitely/not/here/config.txt");
        assert!(missing.is_err());
    }
}
