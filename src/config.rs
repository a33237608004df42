// Configuration loading and parsing (league.toml).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::draft::sequencer::DraftOrderMode;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire league.toml file.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    server: ServerSection,
    #[serde(default)]
    teams: Vec<TeamConfig>,
    #[serde(default)]
    keepers: Vec<KeeperConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub id: String,
    pub name: String,
    /// Auction budget per team.
    pub budget: u32,
    /// Countdown length in seconds for the going-once window.
    pub countdown_secs: i64,
    /// Nomination rotation: "linear" or "snake".
    #[serde(default = "default_order_mode")]
    pub order: DraftOrderMode,
    /// Skip offline teams in the nomination rotation.
    #[serde(default)]
    pub skip_offline_nominators: bool,
    /// Shared secret the admin client presents in its hello.
    pub owner_token: String,
    /// Roster slot counts keyed by slot code (QB, RB, FLEX, BE, ...).
    pub roster: HashMap<String, usize>,
}

fn default_order_mode() -> DraftOrderMode {
    DraftOrderMode::Snake
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSection {
    ws_port: u16,
    /// Database file path. Defaults to a per-user data directory.
    db_path: Option<String>,
    players_csv: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamConfig {
    pub id: String,
    pub name: String,
    /// Nomination order assignment, 1..N, unique per league.
    pub draft_order: u32,
    /// Connection token for this team's owner. Omitted for teams drafting
    /// offline (admin acts on their behalf).
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeeperConfig {
    pub team_id: String,
    pub player_id: String,
    pub price: u32,
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub teams: Vec<TeamConfig>,
    pub keepers: Vec<KeeperConfig>,
    pub ws_port: u16,
    pub db_path: PathBuf,
    pub players_csv: PathBuf,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` relative to
/// the given `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let league_path = base_dir.join("config").join("league.toml");
    let league_text = read_file(&league_path)?;
    let file: LeagueFile = toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
        path: league_path.clone(),
        source: e,
    })?;

    let db_path = match &file.server.db_path {
        Some(p) => PathBuf::from(p),
        None => default_db_path(&file.league.id),
    };

    let config = Config {
        league: file.league,
        teams: file.teams,
        keepers: file.keepers,
        ws_port: file.server.ws_port,
        db_path,
        players_csv: PathBuf::from(&file.server.players_csv),
    };

    validate(&config)?;

    Ok(config)
}

/// Convenience wrapper: loads config relative to the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_from(&cwd)
}

/// Per-user data directory fallback for the database file.
fn default_db_path(league_id: &str) -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("", "", "draft-room") {
        dirs.data_dir().join(format!("{league_id}.db"))
    } else {
        PathBuf::from(format!("{league_id}.db"))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    // League validations
    if config.league.budget == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.budget".into(),
            message: "must be greater than 0".into(),
        });
    }
    if config.league.countdown_secs <= 0 {
        return Err(ConfigError::ValidationError {
            field: "league.countdown_secs".into(),
            message: "must be greater than 0".into(),
        });
    }
    if config.league.owner_token.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.owner_token".into(),
            message: "must not be empty".into(),
        });
    }
    if config.league.roster.values().sum::<usize>() == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.roster".into(),
            message: "must define at least one roster slot".into(),
        });
    }

    // Team validations
    if config.teams.len() < 2 {
        return Err(ConfigError::ValidationError {
            field: "teams".into(),
            message: format!("a draft needs at least 2 teams, got {}", config.teams.len()),
        });
    }
    let mut seen_ids = std::collections::HashSet::new();
    for team in &config.teams {
        if !seen_ids.insert(team.id.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "teams.id".into(),
                message: format!("duplicate team id `{}`", team.id),
            });
        }
    }
    let mut orders: Vec<u32> = config.teams.iter().map(|t| t.draft_order).collect();
    orders.sort_unstable();
    let expected: Vec<u32> = (1..=config.teams.len() as u32).collect();
    if orders != expected {
        return Err(ConfigError::ValidationError {
            field: "teams.draft_order".into(),
            message: format!(
                "draft orders must be exactly 1..{} with no gaps or duplicates",
                config.teams.len()
            ),
        });
    }

    // Keeper validations
    for keeper in &config.keepers {
        if !config.teams.iter().any(|t| t.id == keeper.team_id) {
            return Err(ConfigError::ValidationError {
                field: "keepers.team_id".into(),
                message: format!("keeper references unknown team `{}`", keeper.team_id),
            });
        }
        if keeper.price > config.league.budget {
            return Err(ConfigError::ValidationError {
                field: "keepers.price".into(),
                message: format!(
                    "keeper price {} exceeds league budget {}",
                    keeper.price, config.league.budget
                ),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
