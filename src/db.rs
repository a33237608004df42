// SQLite persistence layer for draft state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::draft::position::Position;
use crate::draft::state::DraftPick;

/// SQLite-backed persistence for draft picks, the event log, and the latest
/// state snapshot.
///
/// Writes happen on the room task only; the mutex exists so read-side
/// helpers (tests, future admin tooling) can share the handle.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn =
            Connection::open(path).with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS draft_picks (
                pick_number INTEGER NOT NULL,
                league_id   TEXT NOT NULL,
                team_id     TEXT NOT NULL,
                player_id   TEXT NOT NULL,
                player_name TEXT NOT NULL,
                position    TEXT NOT NULL,
                price       INTEGER NOT NULL,
                keeper      INTEGER NOT NULL DEFAULT 0,
                timestamp   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (pick_number, league_id)
            );

            CREATE TABLE IF NOT EXISTS draft_events (
                seq        INTEGER PRIMARY KEY AUTOINCREMENT,
                league_id  TEXT NOT NULL,
                event_type TEXT NOT NULL,
                payload    TEXT NOT NULL,
                snapshot   TEXT NOT NULL,
                timestamp  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS draft_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_draft_events_league ON draft_events(league_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Picks
    // ------------------------------------------------------------------

    /// Record a single completed pick. Uses INSERT OR REPLACE keyed on
    /// (pick_number, league_id) so re-persisting after an in-memory renumber
    /// overwrites rather than duplicating.
    pub fn record_pick(&self, pick: &DraftPick, league_id: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO draft_picks
                (pick_number, league_id, team_id, player_id, player_name, position, price, keeper)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                pick.pick_number,
                league_id,
                pick.team_id,
                pick.player_id,
                pick.player_name,
                pick.position.display_str(),
                pick.price,
                pick.keeper,
            ],
        )
        .context("failed to record draft pick")?;
        Ok(())
    }

    /// Replace the entire pick history for a league in one transaction.
    /// Used after undo and reset, where pick numbers shift.
    pub fn replace_picks(&self, picks: &[DraftPick], league_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute(
            "DELETE FROM draft_picks WHERE league_id = ?1",
            params![league_id],
        )
        .context("failed to delete draft picks")?;
        for pick in picks {
            tx.execute(
                "INSERT INTO draft_picks
                    (pick_number, league_id, team_id, player_id, player_name, position, price, keeper)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    pick.pick_number,
                    league_id,
                    pick.team_id,
                    pick.player_id,
                    pick.player_name,
                    pick.position.display_str(),
                    pick.price,
                    pick.keeper,
                ],
            )
            .context("failed to insert draft pick")?;
        }
        tx.commit().context("failed to commit replace_picks")?;
        Ok(())
    }

    /// Load a league's picks ordered by pick number.
    pub fn load_picks(&self, league_id: &str) -> Result<Vec<DraftPick>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT pick_number, team_id, player_id, player_name, position, price, keeper
                 FROM draft_picks WHERE league_id = ?1 ORDER BY pick_number",
            )
            .context("failed to prepare load_picks query")?;

        let rows = stmt
            .query_map(params![league_id], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, u32>(5)?,
                    row.get::<_, bool>(6)?,
                ))
            })
            .context("failed to query draft picks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map draft pick rows")?;

        let mut picks = Vec::with_capacity(rows.len());
        for (pick_number, team_id, player_id, player_name, position, price, keeper) in rows {
            let position = Position::from_str_pos(&position)
                .with_context(|| format!("unknown position `{position}` in stored pick"))?;
            picks.push(DraftPick {
                pick_number,
                team_id,
                player_id,
                player_name,
                position,
                price,
                keeper,
            });
        }
        Ok(picks)
    }

    /// Returns `true` if at least one pick has been recorded for the league.
    pub fn has_draft_in_progress(&self, league_id: &str) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM draft_picks WHERE league_id = ?1)",
                params![league_id],
                |row| row.get(0),
            )
            .context("failed to check draft_picks existence")?;
        Ok(exists)
    }

    /// Returns `true` if a `draftStarted` event exists with no later
    /// `draftReset`. Unlike [`Database::has_draft_in_progress`] this is true
    /// for a started draft with no sales yet.
    pub fn is_draft_started(&self, league_id: &str) -> Result<bool> {
        let conn = self.conn();
        let started: bool = conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM draft_events
                    WHERE league_id = ?1 AND event_type = 'draftStarted'
                      AND seq > COALESCE(
                        (SELECT MAX(seq) FROM draft_events
                         WHERE league_id = ?1 AND event_type = 'draftReset'),
                        0)
                 )",
                params![league_id],
                |row| row.get(0),
            )
            .context("failed to check draftStarted events")?;
        Ok(started)
    }

    // ------------------------------------------------------------------
    // Event log
    // ------------------------------------------------------------------

    /// Append an accepted event with the post-event state snapshot. Returns
    /// the assigned sequence number.
    pub fn append_event(
        &self,
        league_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        snapshot: &serde_json::Value,
    ) -> Result<i64> {
        let payload_str = serde_json::to_string(payload).context("failed to serialize payload")?;
        let snapshot_str =
            serde_json::to_string(snapshot).context("failed to serialize snapshot")?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO draft_events (league_id, event_type, payload, snapshot)
             VALUES (?1, ?2, ?3, ?4)",
            params![league_id, event_type, payload_str, snapshot_str],
        )
        .context("failed to append draft event")?;
        let seq = conn.last_insert_rowid();

        conn.execute(
            "INSERT OR REPLACE INTO draft_state (key, value) VALUES (?1, ?2)",
            params![Self::snapshot_key(league_id), snapshot_str],
        )
        .context("failed to save latest snapshot")?;
        Ok(seq)
    }

    /// Load the most recently persisted state snapshot for a league.
    pub fn load_latest_snapshot(&self, league_id: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM draft_state WHERE key = ?1")
            .context("failed to prepare snapshot query")?;

        let mut rows = stmt
            .query_map(params![Self::snapshot_key(league_id)], |row| {
                row.get::<_, String>(0)
            })
            .context("failed to query snapshot")?;

        match rows.next() {
            Some(row_result) => {
                let json_str = row_result.context("failed to read snapshot row")?;
                let value: serde_json::Value =
                    serde_json::from_str(&json_str).context("failed to deserialize snapshot")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// List the event types recorded for a league, in sequence order.
    pub fn event_types(&self, league_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT event_type FROM draft_events WHERE league_id = ?1 ORDER BY seq")
            .context("failed to prepare event_types query")?;
        let types = stmt
            .query_map(params![league_id], |row| row.get(0))
            .context("failed to query event types")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map event type rows")?;
        Ok(types)
    }

    /// Delete all picks, events, and snapshots for a league. The event log
    /// for other leagues in the same file is untouched.
    pub fn clear_league(&self, league_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute(
            "DELETE FROM draft_picks WHERE league_id = ?1",
            params![league_id],
        )
        .context("failed to delete draft picks")?;
        tx.execute(
            "DELETE FROM draft_events WHERE league_id = ?1",
            params![league_id],
        )
        .context("failed to delete draft events")?;
        tx.execute(
            "DELETE FROM draft_state WHERE key = ?1",
            params![Self::snapshot_key(league_id)],
        )
        .context("failed to delete snapshot")?;
        tx.commit().context("failed to commit clear_league")?;
        Ok(())
    }

    fn snapshot_key(league_id: &str) -> String {
        format!("snapshot:{league_id}")
    }

    /// Test hook: run arbitrary SQL against the live connection, e.g. to
    /// break the schema and exercise persistence failure paths.
    #[cfg(test)]
    pub(crate) fn execute_batch_raw(&self, sql: &str) -> Result<()> {
        self.conn()
            .execute_batch(sql)
            .context("failed to execute raw sql")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_LEAGUE: &str = "league_test";

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    /// Helper: build a sample DraftPick.
    fn sample_pick(pick_number: u32) -> DraftPick {
        DraftPick {
            pick_number,
            team_id: "team_1".to_string(),
            player_id: format!("p{pick_number}"),
            player_name: format!("Player {pick_number}"),
            position: Position::RunningBack,
            price: 25,
            keeper: false,
        }
    }

    // ------------------------------------------------------------------
    // Schema / open
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"draft_picks".to_string()));
        assert!(tables.contains(&"draft_events".to_string()));
        assert!(tables.contains(&"draft_state".to_string()));
    }

    // ------------------------------------------------------------------
    // Picks
    // ------------------------------------------------------------------

    #[test]
    fn insert_and_load_picks_round_trip() {
        let db = test_db();

        db.record_pick(&sample_pick(1), TEST_LEAGUE).unwrap();
        let pick2 = DraftPick {
            pick_number: 2,
            team_id: "team_2".to_string(),
            player_id: "p2".to_string(),
            player_name: "Player 2".to_string(),
            position: Position::Quarterback,
            price: 40,
            keeper: true,
        };
        db.record_pick(&pick2, TEST_LEAGUE).unwrap();

        let picks = db.load_picks(TEST_LEAGUE).unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].pick_number, 1);
        assert_eq!(picks[0].position, Position::RunningBack);
        assert!(!picks[0].keeper);
        assert_eq!(picks[1].team_id, "team_2");
        assert_eq!(picks[1].position, Position::Quarterback);
        assert_eq!(picks[1].price, 40);
        assert!(picks[1].keeper);
    }

    #[test]
    fn load_picks_returns_empty_vec_when_no_picks() {
        let db = test_db();
        let picks = db.load_picks(TEST_LEAGUE).unwrap();
        assert!(picks.is_empty());
    }

    #[test]
    fn record_pick_replaces_on_same_number() {
        let db = test_db();
        db.record_pick(&sample_pick(1), TEST_LEAGUE).unwrap();
        let replacement = DraftPick {
            player_id: "other".to_string(),
            ..sample_pick(1)
        };
        db.record_pick(&replacement, TEST_LEAGUE).unwrap();

        let picks = db.load_picks(TEST_LEAGUE).unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].player_id, "other");
    }

    #[test]
    fn replace_picks_rewrites_history() {
        let db = test_db();
        db.record_pick(&sample_pick(1), TEST_LEAGUE).unwrap();
        db.record_pick(&sample_pick(2), TEST_LEAGUE).unwrap();
        db.record_pick(&sample_pick(3), TEST_LEAGUE).unwrap();

        // Drop pick 2 and renumber, as an undo would.
        let survivors = vec![
            sample_pick(1),
            DraftPick {
                pick_number: 2,
                ..sample_pick(3)
            },
        ];
        db.replace_picks(&survivors, TEST_LEAGUE).unwrap();

        let picks = db.load_picks(TEST_LEAGUE).unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[1].player_id, "p3");
        assert_eq!(picks[1].pick_number, 2);
    }

    #[test]
    fn picks_scoped_to_league() {
        let db = test_db();
        db.record_pick(&sample_pick(1), "league_a").unwrap();
        db.record_pick(&sample_pick(1), "league_b").unwrap();
        db.record_pick(&sample_pick(2), "league_a").unwrap();

        assert_eq!(db.load_picks("league_a").unwrap().len(), 2);
        assert_eq!(db.load_picks("league_b").unwrap().len(), 1);
        assert!(db.load_picks("league_c").unwrap().is_empty());
    }

    #[test]
    fn has_draft_in_progress_false_then_true() {
        let db = test_db();
        assert!(!db.has_draft_in_progress(TEST_LEAGUE).unwrap());

        db.record_pick(&sample_pick(1), TEST_LEAGUE).unwrap();
        assert!(db.has_draft_in_progress(TEST_LEAGUE).unwrap());
    }

    // ------------------------------------------------------------------
    // Event log / snapshot
    // ------------------------------------------------------------------

    #[test]
    fn append_event_assigns_increasing_seq() {
        let db = test_db();
        let seq1 = db
            .append_event(TEST_LEAGUE, "draftStarted", &json!({}), &json!({"phase": "nominating"}))
            .unwrap();
        let seq2 = db
            .append_event(
                TEST_LEAGUE,
                "nominationCreated",
                &json!({"playerId": "p1"}),
                &json!({"phase": "bidding"}),
            )
            .unwrap();
        assert!(seq2 > seq1);

        let types = db.event_types(TEST_LEAGUE).unwrap();
        assert_eq!(types, vec!["draftStarted", "nominationCreated"]);
    }

    #[test]
    fn latest_snapshot_tracks_last_event() {
        let db = test_db();
        assert!(db.load_latest_snapshot(TEST_LEAGUE).unwrap().is_none());

        db.append_event(TEST_LEAGUE, "draftStarted", &json!({}), &json!({"round": 1}))
            .unwrap();
        db.append_event(TEST_LEAGUE, "itemSold", &json!({}), &json!({"round": 2}))
            .unwrap();

        let snapshot = db.load_latest_snapshot(TEST_LEAGUE).unwrap().unwrap();
        assert_eq!(snapshot, json!({"round": 2}));
    }

    #[test]
    fn draft_started_flag_follows_start_and_reset_events() {
        let db = test_db();
        assert!(!db.is_draft_started(TEST_LEAGUE).unwrap());

        db.append_event(TEST_LEAGUE, "draftStarted", &json!({}), &json!({}))
            .unwrap();
        assert!(db.is_draft_started(TEST_LEAGUE).unwrap());

        db.append_event(TEST_LEAGUE, "draftReset", &json!({}), &json!({}))
            .unwrap();
        assert!(!db.is_draft_started(TEST_LEAGUE).unwrap());

        db.append_event(TEST_LEAGUE, "draftStarted", &json!({}), &json!({}))
            .unwrap();
        assert!(db.is_draft_started(TEST_LEAGUE).unwrap());
    }

    #[test]
    fn snapshots_scoped_to_league() {
        let db = test_db();
        db.append_event("league_a", "draftStarted", &json!({}), &json!({"which": "a"}))
            .unwrap();
        db.append_event("league_b", "draftStarted", &json!({}), &json!({"which": "b"}))
            .unwrap();

        let a = db.load_latest_snapshot("league_a").unwrap().unwrap();
        let b = db.load_latest_snapshot("league_b").unwrap().unwrap();
        assert_eq!(a, json!({"which": "a"}));
        assert_eq!(b, json!({"which": "b"}));
    }

    // ------------------------------------------------------------------
    // clear_league
    // ------------------------------------------------------------------

    #[test]
    fn clear_league_removes_only_that_league() {
        let db = test_db();
        db.record_pick(&sample_pick(1), "league_a").unwrap();
        db.record_pick(&sample_pick(1), "league_b").unwrap();
        db.append_event("league_a", "draftStarted", &json!({}), &json!({}))
            .unwrap();
        db.append_event("league_b", "draftStarted", &json!({}), &json!({}))
            .unwrap();

        db.clear_league("league_a").unwrap();

        assert!(!db.has_draft_in_progress("league_a").unwrap());
        assert!(db.event_types("league_a").unwrap().is_empty());
        assert!(db.load_latest_snapshot("league_a").unwrap().is_none());

        assert!(db.has_draft_in_progress("league_b").unwrap());
        assert_eq!(db.event_types("league_b").unwrap().len(), 1);
    }
}
