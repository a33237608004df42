// Room actor: single-writer coordinator for one league's draft.
//
// All mutations flow through one mpsc queue processed by one task, so
// concurrent bids, countdown expiries, and admin overrides are applied in a
// single authoritative order with no locking in the engine. Countdown
// timers are plain tasks that post an expiry command back into the same
// queue; the generation check in the engine discards superseded timers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::db::Database;
use crate::draft::engine::{DraftEngine, DraftEvent};
use crate::draft::state::DraftState;
use crate::draft::DraftError;
use crate::protocol::{ClientMessage, ServerMessage, StateSnapshot};

/// Identifies one WebSocket connection for the lifetime of the room.
pub type ConnId = u64;

/// Commands processed by the room task, in arrival order.
#[derive(Debug)]
pub enum RoomCommand {
    Connect {
        conn_id: ConnId,
        /// `None` for the league owner connection.
        team_id: Option<String>,
        is_owner: bool,
        sender: mpsc::UnboundedSender<ServerMessage>,
    },
    Disconnect {
        conn_id: ConnId,
    },
    Action {
        conn_id: ConnId,
        msg: ClientMessage,
    },
    /// Posted by a countdown timer task when its deadline passes.
    CountdownExpired {
        generation: u64,
    },
}

/// Cloneable handle for submitting commands to a room.
#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub async fn send(&self, cmd: RoomCommand) -> bool {
        self.tx.send(cmd).await.is_ok()
    }
}

struct Connection {
    team_id: Option<String>,
    is_owner: bool,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

/// The room actor. Owns the engine and the database handle; runs until every
/// command sender is dropped.
pub struct Room {
    engine: DraftEngine,
    db: Arc<Database>,
    connections: HashMap<ConnId, Connection>,
    /// Self-handle given to countdown timer tasks.
    cmd_tx: mpsc::Sender<RoomCommand>,
}

/// Persist attempts before giving up and carrying on with in-memory state.
const PERSIST_ATTEMPTS: u32 = 3;

impl Room {
    /// Spawn the room task and return a handle for submitting commands.
    pub fn spawn(engine: DraftEngine, db: Arc<Database>) -> RoomHandle {
        let (tx, rx) = mpsc::channel(256);
        let room = Room {
            engine,
            db,
            connections: HashMap::new(),
            cmd_tx: tx.clone(),
        };
        tokio::spawn(room.run(rx));
        RoomHandle { tx }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>) {
        info!(league_id = %self.engine.state.league_id, "room task started");
        while let Some(cmd) = rx.recv().await {
            self.handle_command(cmd);
        }
        info!(league_id = %self.engine.state.league_id, "room task stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Connect {
                conn_id,
                team_id,
                is_owner,
                sender,
            } => self.handle_connect(conn_id, team_id, is_owner, sender),
            RoomCommand::Disconnect { conn_id } => self.handle_disconnect(conn_id),
            RoomCommand::Action { conn_id, msg } => self.handle_action(conn_id, msg),
            RoomCommand::CountdownExpired { generation } => {
                self.handle_countdown_expired(generation)
            }
        }
    }

    // ------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------

    fn handle_connect(
        &mut self,
        conn_id: ConnId,
        team_id: Option<String>,
        is_owner: bool,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) {
        if let Some(team) = &team_id {
            self.engine.mark_connected(team);
        }

        let now = Utc::now();
        let welcome = ServerMessage::Welcome {
            team_id: team_id.clone(),
            is_owner,
            snapshot: StateSnapshot::from_engine(&self.engine, now),
        };
        let _ = sender.send(welcome);

        self.connections.insert(
            conn_id,
            Connection {
                team_id: team_id.clone(),
                is_owner,
                sender,
            },
        );
        debug!(conn_id, team_id = ?team_id, is_owner, "client connected");

        // Presence changed; everyone gets the updated snapshot.
        self.broadcast(None, now);
    }

    fn handle_disconnect(&mut self, conn_id: ConnId) {
        let Some(conn) = self.connections.remove(&conn_id) else {
            return;
        };
        if let Some(team) = &conn.team_id {
            // The team stays connected while any of its connections remain.
            let still_attached = self
                .connections
                .values()
                .any(|c| c.team_id.as_deref() == Some(team.as_str()));
            if !still_attached {
                self.engine.mark_disconnected(team);
            }
        }
        debug!(conn_id, team_id = ?conn.team_id, "client disconnected");
        self.broadcast(None, Utc::now());
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    fn handle_action(&mut self, conn_id: ConnId, msg: ClientMessage) {
        let now = Utc::now();

        if let ClientMessage::GetState = msg {
            let reply = ServerMessage::State {
                snapshot: StateSnapshot::from_engine(&self.engine, now),
                event: None,
            };
            self.send_to(conn_id, reply);
            return;
        }

        let before = self.engine.state.clone();
        match self.dispatch(conn_id, &msg, now) {
            Ok(event) => {
                if !self.persist(&event) {
                    self.suspend_after_persist_failure(before, now);
                    return;
                }
                if let DraftEvent::CountdownStarted { ends_at, generation } = event {
                    self.arm_countdown(ends_at, generation);
                }
                self.broadcast(Some(event), now);
            }
            Err(err) => {
                debug!(conn_id, %err, "action rejected");
                self.send_to(
                    conn_id,
                    ServerMessage::Rejected {
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    },
                );
            }
        }
    }

    /// Authorize and apply one client action. Team actions use the
    /// connection's authenticated team identity, never one named in the
    /// message; admin actions require the owner connection.
    fn dispatch(
        &mut self,
        conn_id: ConnId,
        msg: &ClientMessage,
        now: DateTime<Utc>,
    ) -> Result<DraftEvent, DraftError> {
        let conn = self
            .connections
            .get(&conn_id)
            .ok_or(DraftError::NotAuthorized)?;
        let team_id = conn.team_id.clone();
        let is_owner = conn.is_owner;

        match msg {
            ClientMessage::Nominate { player_id, amount } => {
                let team = team_id.ok_or(DraftError::NotAuthorized)?;
                self.engine.nominate(&team, player_id, *amount, now)
            }
            ClientMessage::Bid { amount } => {
                let team = team_id.ok_or(DraftError::NotAuthorized)?;
                self.engine.bid(&team, *amount, now)
            }
            ClientMessage::StartCountdown => {
                // Any authenticated participant may put the hammer up.
                self.engine.start_countdown(now)
            }
            ClientMessage::AdminStart => {
                self.require_owner(is_owner)?;
                self.engine.admin_start(now)
            }
            ClientMessage::AdminPause => {
                self.require_owner(is_owner)?;
                self.engine.admin_pause()
            }
            ClientMessage::AdminResume => {
                self.require_owner(is_owner)?;
                self.engine.admin_resume()
            }
            ClientMessage::AdminUndoLastBid => {
                self.require_owner(is_owner)?;
                self.engine.admin_undo_bid()
            }
            ClientMessage::AdminForceAssign {
                team_id,
                player_id,
                price,
            } => {
                self.require_owner(is_owner)?;
                self.engine.admin_force_assign(team_id, player_id, *price)
            }
            ClientMessage::AdminReset { keep_keepers } => {
                self.require_owner(is_owner)?;
                self.engine.admin_reset(*keep_keepers)
            }
            ClientMessage::Hello { .. } | ClientMessage::GetState => {
                // Handled before dispatch; reaching here is a handshake bug.
                Err(DraftError::NotAuthorized)
            }
        }
    }

    fn require_owner(&self, is_owner: bool) -> Result<(), DraftError> {
        if is_owner {
            Ok(())
        } else {
            Err(DraftError::NotAuthorized)
        }
    }

    // ------------------------------------------------------------------
    // Countdown timers
    // ------------------------------------------------------------------

    fn handle_countdown_expired(&mut self, generation: u64) {
        let now = Utc::now();
        let before = self.engine.state.clone();
        match self.engine.expire_countdown(generation, now) {
            Ok(Some(event)) => {
                if !self.persist(&event) {
                    self.suspend_after_persist_failure(before, now);
                    return;
                }
                self.broadcast(Some(event), now);
            }
            Ok(None) => {
                debug!(generation, "stale countdown expiry discarded");
            }
            Err(err) => {
                error!(%err, "countdown expiry failed");
            }
        }
    }

    /// Schedule an expiry command for the countdown deadline. The small pad
    /// keeps a timer from firing a hair before its own deadline and being
    /// discarded as early.
    fn arm_countdown(&self, ends_at: DateTime<Utc>, generation: u64) {
        let tx = self.cmd_tx.clone();
        let wait = (ends_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
            + std::time::Duration::from_millis(50);
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let _ = tx.send(RoomCommand::CountdownExpired { generation }).await;
        });
    }

    // ------------------------------------------------------------------
    // Persistence and fan-out
    // ------------------------------------------------------------------

    /// Persist an accepted event and the post-event snapshot, retrying on
    /// failure. Returns `false` when the event log write ultimately fails;
    /// the caller must then roll the transition back rather than acknowledge
    /// it. A pick-table write failure alone is tolerated: the snapshot is
    /// already durable and the pick table is a projection of it.
    fn persist(&self, event: &DraftEvent) -> bool {
        if !event.is_persisted() {
            return true;
        }
        let league_id = self.engine.state.league_id.clone();
        let payload = match serde_json::to_value(event) {
            Ok(v) => v,
            Err(e) => {
                error!(%e, "failed to serialize event payload");
                return false;
            }
        };
        let snapshot = match serde_json::to_value(&self.engine.state) {
            Ok(v) => v,
            Err(e) => {
                error!(%e, "failed to serialize state snapshot");
                return false;
            }
        };

        for attempt in 1..=PERSIST_ATTEMPTS {
            match self
                .db
                .append_event(&league_id, event.event_type(), &payload, &snapshot)
            {
                Ok(_) => break,
                Err(e) if attempt < PERSIST_ATTEMPTS => {
                    warn!(%e, attempt, "event persist failed, retrying");
                }
                Err(e) => {
                    error!(%e, "event persist failed, refusing to acknowledge");
                    return false;
                }
            }
        }

        if self.affects_picks(event) {
            if let Err(e) = self.db.replace_picks(&self.engine.state.picks, &league_id) {
                error!(%e, "failed to persist pick history");
            }
        }
        true
    }

    /// Roll the engine back to its pre-action state and freeze the room.
    /// An event that could not be made durable is never acknowledged or
    /// broadcast; the draft waits paused for an admin to resume once the
    /// database is healthy again.
    fn suspend_after_persist_failure(&mut self, before: DraftState, now: DateTime<Utc>) {
        error!(
            league_id = %self.engine.state.league_id,
            "persist failed, rolling back and pausing the draft"
        );
        self.engine.state = before;
        let _ = self.engine.admin_pause();
        self.broadcast(None, now);
    }

    fn affects_picks(&self, event: &DraftEvent) -> bool {
        matches!(
            event,
            DraftEvent::DraftStarted
                | DraftEvent::ItemSold { .. }
                | DraftEvent::AdminForceAssign { .. }
                | DraftEvent::DraftReset
        )
    }

    fn broadcast(&self, event: Option<DraftEvent>, now: DateTime<Utc>) {
        let msg = ServerMessage::State {
            snapshot: StateSnapshot::from_engine(&self.engine, now),
            event,
        };
        for conn in self.connections.values() {
            let _ = conn.sender.send(msg.clone());
        }
    }

    fn send_to(&self, conn_id: ConnId, msg: ServerMessage) {
        if let Some(conn) = self.connections.get(&conn_id) {
            let _ = conn.sender.send(msg);
        }
    }
}

/// Build the league's draft state, restoring from the database when a prior
/// session exists.
///
/// Restoration prefers the latest full snapshot; when only a pick history
/// survives, budgets and rosters are rebuilt by replaying it. A restored
/// mid-bidding session re-opens without a countdown running.
pub fn load_or_new_state(
    db: &Database,
    league_id: &str,
    teams: Vec<(String, String, u32, bool)>,
    budget: u32,
    roster_config: &HashMap<String, usize>,
) -> anyhow::Result<DraftState> {
    if let Some(snapshot) = db.load_latest_snapshot(league_id)? {
        match serde_json::from_value::<DraftState>(snapshot) {
            Ok(mut state) => {
                info!(league_id, picks = state.picks.len(), "restored draft state from snapshot");
                state.clock_ends_at = None;
                state.connected.clear();
                return Ok(state);
            }
            Err(e) => {
                warn!(%e, "snapshot unreadable, falling back to pick replay");
            }
        }
    }

    let mut state = DraftState::new(league_id, teams, budget, roster_config);
    let picks = db.load_picks(league_id)?;
    if !picks.is_empty() || db.is_draft_started(league_id)? {
        info!(league_id, picks = picks.len(), "rebuilding draft state from pick history");
        state.restore_from_picks(picks, budget, roster_config);
        state.phase = crate::draft::state::Phase::Paused;
        state.resume_phase = Some(crate::draft::state::Phase::Nominating);
    }
    Ok(state)
}
