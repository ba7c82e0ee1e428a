//! Application-level configuration loading, including phase durations and
//! the built-in prompt deck.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIP_ARENA_BACK_CONFIG_PATH";

const DEFAULT_ANSWER_SECONDS: u64 = 60;
const DEFAULT_VOTE_SECONDS: u64 = 45;
const DEFAULT_TICK_SECONDS: u64 = 10;
const DEFAULT_MAX_ROUNDS: u32 = 20;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    answer_seconds: u64,
    vote_seconds: u64,
    tick_seconds: u64,
    max_rounds: u32,
    prompts: Vec<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        prompts = config.prompts.len(),
                        answer_seconds = config.answer_seconds,
                        vote_seconds = config.vote_seconds,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Length of the answering window.
    pub fn answering_duration(&self) -> Duration {
        Duration::from_secs(self.answer_seconds)
    }

    /// Length of the voting window.
    pub fn voting_duration(&self) -> Duration {
        Duration::from_secs(self.vote_seconds)
    }

    /// Cadence of the advisory remaining-time ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }

    /// Upper bound accepted for a game's round count.
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Draw `count` questions from the prompt deck in random order.
    ///
    /// The deck is reused from the top once exhausted, so a game may ask
    /// for more rounds than the deck holds.
    pub fn draw_prompts(&self, count: usize) -> Vec<String> {
        let mut deck: Vec<&String> = self.prompts.iter().collect();
        deck.shuffle(&mut rand::rng());
        deck.iter()
            .cycle()
            .take(count)
            .map(|prompt| (*prompt).clone())
            .collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            answer_seconds: DEFAULT_ANSWER_SECONDS,
            vote_seconds: DEFAULT_VOTE_SECONDS,
            tick_seconds: DEFAULT_TICK_SECONDS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            prompts: default_prompts(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at
/// [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    answer_seconds: Option<u64>,
    #[serde(default)]
    vote_seconds: Option<u64>,
    #[serde(default)]
    tick_seconds: Option<u64>,
    #[serde(default)]
    max_rounds: Option<u32>,
    #[serde(default)]
    prompts: Vec<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let prompts = if value.prompts.is_empty() {
            defaults.prompts
        } else {
            value.prompts
        };
        Self {
            answer_seconds: value.answer_seconds.unwrap_or(defaults.answer_seconds).max(1),
            vote_seconds: value.vote_seconds.unwrap_or(defaults.vote_seconds).max(1),
            tick_seconds: value.tick_seconds.unwrap_or(defaults.tick_seconds).max(1),
            max_rounds: value.max_rounds.unwrap_or(defaults.max_rounds).max(1),
            prompts,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in prompt deck shipped with the binary.
fn default_prompts() -> Vec<String> {
    [
        "The worst possible name for a luxury perfume",
        "A rejected slogan for the national lottery",
        "The last thing you want to hear from your dentist",
        "A terrible theme for a wedding",
        "The most disappointing superpower imaginable",
        "A sign you have been working from home too long",
        "The title of a self-help book nobody should write",
        "What robots talk about when humans leave the room",
        "A questionable item to bring on a first date",
        "The real reason dinosaurs went extinct",
        "An unhelpful message to find in a fortune cookie",
        "The worst thing to shout in a quiet library",
        "A new olympic sport that would end in disaster",
        "What your pet would post on social media",
        "A feature no smartphone should ever have",
        "The most suspicious thing to say at airport security",
        "A bad first line for an acceptance speech",
        "The secret ingredient in grandma's famous recipe",
        "A movie sequel nobody asked for",
        "The fine print on a deal that sounds too good",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}
