// WebSocket server: authentication handshake and per-connection plumbing.
//
// Each accepted socket gets a reader loop and a writer task. The reader
// requires a HELLO as the first message, registers the connection with the
// room, then forwards every parsed action into the room's command queue.
// The writer drains the connection's outbound channel. All draft logic
// lives behind the room; this layer only authenticates and shuttles JSON.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::config::Config;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{ConnId, RoomCommand, RoomHandle};

/// Token table for the HELLO handshake.
#[derive(Debug, Clone)]
pub struct Auth {
    pub league_id: String,
    pub owner_token: String,
    /// token -> team_id for teams drafting online.
    pub team_tokens: HashMap<String, String>,
}

impl Auth {
    pub fn from_config(config: &Config) -> Self {
        let team_tokens = config
            .teams
            .iter()
            .filter_map(|t| t.token.clone().map(|tok| (tok, t.id.clone())))
            .collect();
        Auth {
            league_id: config.league.id.clone(),
            owner_token: config.league.owner_token.clone(),
            team_tokens,
        }
    }
}

/// The authenticated identity of one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// `None` for the league owner.
    pub team_id: Option<String>,
    pub is_owner: bool,
}

/// Validate a HELLO message against the token table.
///
/// The owner token authenticates the admin connection; a team token
/// authenticates as that team regardless of any `teamId` the client sent.
/// Identity comes from the token, never from a client-supplied field.
pub fn authenticate(msg: &ClientMessage, auth: &Auth) -> Result<Identity, String> {
    let ClientMessage::Hello {
        league_id, token, ..
    } = msg
    else {
        return Err("first message must be HELLO".to_string());
    };

    if league_id != &auth.league_id {
        return Err(format!("unknown league `{league_id}`"));
    }
    if token == &auth.owner_token {
        return Ok(Identity {
            team_id: None,
            is_owner: true,
        });
    }
    if let Some(team_id) = auth.team_tokens.get(token) {
        return Ok(Identity {
            team_id: Some(team_id.clone()),
            is_owner: false,
        });
    }
    Err("invalid token".to_string())
}

/// Run the WebSocket server on the given port, registering every
/// authenticated connection with the room. Runs until the process exits.
pub async fn run(port: u16, auth: Auth, room: RoomHandle) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    let local_addr = listener.local_addr()?;
    info!("WebSocket server listening on {local_addr}");

    let next_conn_id = Arc::new(AtomicU64::new(1));

    loop {
        let (stream, addr) = listener.accept().await?;
        let addr_str = addr.to_string();
        let auth = auth.clone();
        let room = room.clone();
        let conn_id = next_conn_id.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr_str}: {e}");
                    return;
                }
            };
            info!("Accepted WebSocket connection from {addr_str}");

            let (mut write, read) = ws_stream.split();
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();

            let writer = tokio::spawn(async move {
                while let Some(msg) = out_rx.recv().await {
                    let text = match serde_json::to_string(&msg) {
                        Ok(t) => t,
                        Err(e) => {
                            warn!("failed to serialize outbound message: {e}");
                            continue;
                        }
                    };
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            });

            serve_connection(read, out_tx, conn_id, &auth, &room, &addr_str).await;
            room.send(RoomCommand::Disconnect { conn_id }).await;
            writer.abort();
        });
    }
}

/// Drive one connection: handshake, then the action loop. Generic over the
/// inbound stream so it can be tested with in-memory streams without
/// opening TCP ports.
pub async fn serve_connection<St>(
    mut read: St,
    out_tx: mpsc::UnboundedSender<ServerMessage>,
    conn_id: ConnId,
    auth: &Auth,
    room: &RoomHandle,
    addr: &str,
) where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    // Handshake: the first text frame must be a valid HELLO.
    let identity = loop {
        let Some(msg_result) = read.next().await else {
            return;
        };
        match msg_result {
            Ok(Message::Text(text)) => match parse_and_authenticate(&text, auth) {
                Ok(identity) => break identity,
                Err(reason) => {
                    warn!("rejected handshake from {addr}: {reason}");
                    let _ = out_tx.send(ServerMessage::Rejected {
                        kind: "NotAuthorized".to_string(),
                        message: reason,
                    });
                    return;
                }
            },
            Ok(Message::Close(_)) => return,
            Err(e) => {
                warn!("WebSocket error from {addr} during handshake: {e}");
                return;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    };

    if !room
        .send(RoomCommand::Connect {
            conn_id,
            team_id: identity.team_id.clone(),
            is_owner: identity.is_owner,
            sender: out_tx.clone(),
        })
        .await
    {
        return;
    }

    process_actions(read, out_tx, conn_id, room, addr).await;
}

fn parse_and_authenticate(text: &str, auth: &Auth) -> Result<Identity, String> {
    let msg: ClientMessage =
        serde_json::from_str(text).map_err(|e| format!("malformed HELLO: {e}"))?;
    authenticate(&msg, auth)
}

/// Forward parsed actions from an authenticated connection into the room.
/// Malformed frames are answered with a rejection and do not close the
/// connection.
pub async fn process_actions<St>(
    mut read: St,
    out_tx: mpsc::UnboundedSender<ServerMessage>,
    conn_id: ConnId,
    room: &RoomHandle,
    addr: &str,
) where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = read.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Hello { .. }) => {
                    let _ = out_tx.send(ServerMessage::Rejected {
                        kind: "NotAuthorized".to_string(),
                        message: "already authenticated".to_string(),
                    });
                }
                Ok(msg) => {
                    if !room.send(RoomCommand::Action { conn_id, msg }).await {
                        return;
                    }
                }
                Err(e) => {
                    let _ = out_tx.send(ServerMessage::Rejected {
                        kind: "Malformed".to_string(),
                        message: format!("could not parse message: {e}"),
                    });
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::draft::engine::test_support::{player_pool, roster_config};
    use crate::draft::engine::{DraftEngine, RoomRules};
    use crate::draft::sequencer::DraftOrderMode;
    use crate::draft::state::DraftState;
    use crate::room::Room;
    use futures_util::stream;
    use tokio_tungstenite::tungstenite::Error as WsError;

    fn test_auth() -> Auth {
        let mut team_tokens = HashMap::new();
        team_tokens.insert("tok-a".to_string(), "a".to_string());
        team_tokens.insert("tok-b".to_string(), "b".to_string());
        Auth {
            league_id: "league_1".to_string(),
            owner_token: "owner-secret".to_string(),
            team_tokens,
        }
    }

    fn test_room() -> RoomHandle {
        let teams = vec![
            ("a".to_string(), "Team A".to_string(), 1, true),
            ("b".to_string(), "Team B".to_string(), 2, true),
        ];
        let state = DraftState::new("league_1", teams, 200, &roster_config());
        let rules = RoomRules {
            countdown_secs: 10,
            order_mode: DraftOrderMode::Snake,
            skip_offline_nominators: false,
        };
        let engine = DraftEngine::new(state, player_pool(), Vec::new(), rules);
        let db = Arc::new(Database::open(":memory:").unwrap());
        Room::spawn(engine, db)
    }

    /// Helper: create a stream of Message results from a vec.
    fn mock_stream(
        messages: Vec<Result<Message, WsError>>,
    ) -> impl Stream<Item = Result<Message, WsError>> + Unpin {
        stream::iter(messages)
    }

    // ------------------------------------------------------------------
    // authenticate
    // ------------------------------------------------------------------

    #[test]
    fn owner_token_authenticates_as_owner() {
        let msg = ClientMessage::Hello {
            league_id: "league_1".to_string(),
            team_id: None,
            token: "owner-secret".to_string(),
        };
        let identity = authenticate(&msg, &test_auth()).unwrap();
        assert!(identity.is_owner);
        assert!(identity.team_id.is_none());
    }

    #[test]
    fn team_token_authenticates_as_that_team() {
        let msg = ClientMessage::Hello {
            league_id: "league_1".to_string(),
            team_id: Some("b".to_string()), // client claim is ignored
            token: "tok-a".to_string(),
        };
        let identity = authenticate(&msg, &test_auth()).unwrap();
        assert!(!identity.is_owner);
        assert_eq!(identity.team_id.as_deref(), Some("a"));
    }

    #[test]
    fn unknown_token_rejected() {
        let msg = ClientMessage::Hello {
            league_id: "league_1".to_string(),
            team_id: None,
            token: "wrong".to_string(),
        };
        assert!(authenticate(&msg, &test_auth()).is_err());
    }

    #[test]
    fn wrong_league_rejected() {
        let msg = ClientMessage::Hello {
            league_id: "other_league".to_string(),
            team_id: None,
            token: "owner-secret".to_string(),
        };
        assert!(authenticate(&msg, &test_auth()).is_err());
    }

    #[test]
    fn non_hello_first_message_rejected() {
        let msg = ClientMessage::Bid { amount: 10 };
        assert!(authenticate(&msg, &test_auth()).is_err());
    }

    // ------------------------------------------------------------------
    // serve_connection handshake
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn handshake_then_action_reaches_room() {
        let room = test_room();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        let messages = vec![
            Ok(Message::Text(
                r#"{"type":"HELLO","leagueId":"league_1","token":"owner-secret"}"#.into(),
            )),
            Ok(Message::Text(r#"{"type":"ADMIN_START"}"#.into())),
        ];
        serve_connection(mock_stream(messages), out_tx, 1, &test_auth(), &room, "test").await;

        // Welcome from the room, then the draftStarted broadcast.
        let welcome = out_rx.recv().await.unwrap();
        match welcome {
            ServerMessage::Welcome { is_owner, .. } => assert!(is_owner),
            other => panic!("expected Welcome, got {other:?}"),
        }
        loop {
            match out_rx.recv().await.unwrap() {
                ServerMessage::State {
                    event: Some(event), ..
                } => {
                    assert_eq!(event.event_type(), "draftStarted");
                    break;
                }
                ServerMessage::State { .. } => {}
                other => panic!("unexpected message {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn bad_token_gets_rejection_and_no_welcome() {
        let room = test_room();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        let messages = vec![Ok(Message::Text(
            r#"{"type":"HELLO","leagueId":"league_1","token":"nope"}"#.into(),
        ))];
        serve_connection(mock_stream(messages), out_tx, 1, &test_auth(), &room, "test").await;

        match out_rx.recv().await.unwrap() {
            ServerMessage::Rejected { kind, .. } => assert_eq!(kind, "NotAuthorized"),
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert!(out_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn action_before_hello_is_rejected() {
        let room = test_room();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        let messages = vec![Ok(Message::Text(r#"{"type":"BID","amount":5}"#.into()))];
        serve_connection(mock_stream(messages), out_tx, 1, &test_auth(), &room, "test").await;

        match out_rx.recv().await.unwrap() {
            ServerMessage::Rejected { kind, .. } => assert_eq!(kind, "NotAuthorized"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_frame_rejected_without_disconnect() {
        let room = test_room();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        let messages = vec![
            Ok(Message::Text(
                r#"{"type":"HELLO","leagueId":"league_1","token":"tok-a"}"#.into(),
            )),
            Ok(Message::Text("not json at all".into())),
            Ok(Message::Text(r#"{"type":"GET_STATE"}"#.into())),
        ];
        serve_connection(mock_stream(messages), out_tx, 1, &test_auth(), &room, "test").await;

        let mut saw_malformed = false;
        let mut saw_state_reply = false;
        while let Some(msg) = out_rx.recv().await {
            match msg {
                ServerMessage::Rejected { kind, .. } if kind == "Malformed" => {
                    saw_malformed = true;
                }
                ServerMessage::State { event: None, .. } => {
                    saw_state_reply = true;
                }
                _ => {}
            }
            if saw_malformed && saw_state_reply {
                break;
            }
        }
        assert!(saw_malformed, "malformed frame should produce a rejection");
        assert!(saw_state_reply, "connection should stay usable after a malformed frame");
    }

    #[tokio::test]
    async fn second_hello_is_rejected() {
        let room = test_room();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        let hello = r#"{"type":"HELLO","leagueId":"league_1","token":"tok-a"}"#;
        let messages = vec![
            Ok(Message::Text(hello.into())),
            Ok(Message::Text(hello.into())),
        ];
        serve_connection(mock_stream(messages), out_tx, 1, &test_auth(), &room, "test").await;

        let mut saw_rejection = false;
        while let Some(msg) = out_rx.recv().await {
            if let ServerMessage::Rejected { message, .. } = msg {
                assert!(message.contains("already authenticated"));
                saw_rejection = true;
                break;
            }
        }
        assert!(saw_rejection);
    }

    #[tokio::test]
    async fn binary_and_ping_frames_ignored_during_handshake() {
        let room = test_room();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        let messages = vec![
            Ok(Message::Binary(vec![1, 2, 3].into())),
            Ok(Message::Ping(vec![].into())),
            Ok(Message::Text(
                r#"{"type":"HELLO","leagueId":"league_1","token":"tok-a"}"#.into(),
            )),
        ];
        serve_connection(mock_stream(messages), out_tx, 1, &test_auth(), &room, "test").await;

        match out_rx.recv().await.unwrap() {
            ServerMessage::Welcome { team_id, .. } => assert_eq!(team_id.as_deref(), Some("a")),
            other => panic!("expected Welcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_frame_during_handshake_ends_quietly() {
        let room = test_room();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        let messages = vec![Ok(Message::Close(None))];
        serve_connection(mock_stream(messages), out_tx, 1, &test_auth(), &room, "test").await;
        assert!(out_rx.recv().await.is_none());
    }
}
