// Player pool loading from CSV.
//
// Reads a simple player pool file with `id,name,position` columns. The pool
// is immutable reference data: the engine only tracks drafted/undrafted
// status per league and never mutates a player record.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::draft::position::Position;

/// An item available to be drafted.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: Position,
}

#[derive(Debug, thiserror::Error)]
pub enum PlayerPoolError {
    #[error("failed to read player pool {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("player pool is empty: {path}")]
    Empty { path: String },
}

/// Raw CSV row. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    id: String,
    name: String,
    position: String,
}

/// Load the player pool from a CSV file, keyed by player ID.
///
/// Rows with an unknown position string or a duplicate ID are skipped with
/// a warning rather than failing the whole load.
pub fn load_player_pool(path: &Path) -> Result<HashMap<String, Player>, PlayerPoolError> {
    let path_str = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|e| PlayerPoolError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    let mut reader = csv::Reader::from_reader(contents.as_bytes());

    let mut pool = HashMap::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        let row = result.map_err(|e| PlayerPoolError::Csv {
            path: path_str.clone(),
            source: e,
        })?;

        let Some(position) = Position::from_str_pos(&row.position) else {
            warn!(id = %row.id, position = %row.position, "skipping player with unknown position");
            continue;
        };
        if position.is_absorption_slot() {
            warn!(id = %row.id, position = %row.position, "skipping player with slot-only position");
            continue;
        }
        if pool.contains_key(&row.id) {
            warn!(id = %row.id, "skipping duplicate player id");
            continue;
        }

        pool.insert(
            row.id.clone(),
            Player {
                id: row.id,
                name: row.name,
                position,
            },
        );
    }

    if pool.is_empty() {
        return Err(PlayerPoolError::Empty { path: path_str });
    }

    Ok(pool)
}
