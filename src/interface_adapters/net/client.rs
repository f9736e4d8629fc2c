use crate::interface_adapters::communicator::{OutboundFrame, serialize_message};
use crate::interface_adapters::net::registry::AdmissionError;
use crate::interface_adapters::protocol::{
    ClientMessage, ConnResDto, SceneMetaDto, ServerChatDto, ServerMessage,
};
use crate::interface_adapters::state::AppState;
use crate::domain::prop::ClientId;
use crate::use_cases::types::{SceneCommand, Target};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    CommandsClosed,
    OutboundClosed,
    ClosedBeforeAdmission,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_CHAT_CHARS: usize = 200;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // Separate connection id for correlating logs before/after a client_id exists.
    let mut conn_id = Uuid::new_v4().simple().to_string();
    conn_id.truncate(8);
    let span = info_span!("conn", %conn_id, client_id = tracing::field::Empty);
    let _enter = span.enter();

    let mut ctx = match admit_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeAdmission) => {
            info!("client disconnected before admission");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "connection failed during admission");
            let _ = socket.close().await;
            return;
        }
    };

    span.record("client_id", ctx.client_id.to_string().as_str());
    info!(name_tag = %ctx.name_tag, "client admitted");

    if let Err(e) = run_client_loop(&mut socket, &state, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let bytes = serialize_message(msg).map_err(NetError::Serialization)?;
    let len = bytes.len();
    socket
        .send(Message::Text(bytes))
        .await
        .map_err(NetError::Ws)?;
    Ok(len)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

struct ConnCtx {
    pub client_id: ClientId,
    pub name_tag: String,
    pub outbound_rx: broadcast::Receiver<OutboundFrame>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_act_full_log: Instant,
    pub last_lag_log: Instant,
    pub last_invalid_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

/// Reads frames until a valid `conn` request passes the admission chain.
/// Non-`conn` envelopes are answered with `notReg`; refused admissions get
/// a restricted `connRes` and, for every cause except re-registration,
/// a closed socket.
async fn admit_connection(socket: &mut WebSocket, state: &Arc<AppState>) -> Result<ConnCtx, NetError> {
    // Subscribe to the outbound channel *before* any await so the first
    // tick after admission cannot be missed.
    let outbound_rx = state.outbound_tx.subscribe();

    let mut msgs_in: u64 = 0;
    let mut bytes_in: u64 = 0;
    let mut invalid_json: u32 = 0;
    let mut last_invalid_log = Instant::now() - LOG_THROTTLE;

    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeAdmission);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                msgs_in += 1;
                bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Conn(payload)) => {
                        match state.registry.admit(&payload.client_name, false).await {
                            Ok((client_id, name_tag)) => {
                                let res =
                                    ServerMessage::ConnRes(ConnResDto::allowed(client_id, &name_tag));
                                if let Err(err) = send_message(socket, &res).await {
                                    // Free the seat if the handshake reply never made it out.
                                    state.registry.remove(client_id).await;
                                    return Err(err);
                                }

                                if state
                                    .command_tx
                                    .send(SceneCommand::Connect {
                                        client_id,
                                        name_tag: name_tag.clone(),
                                    })
                                    .await
                                    .is_err()
                                {
                                    state.registry.remove(client_id).await;
                                    return Err(NetError::CommandsClosed);
                                }

                                let now = Instant::now() - LOG_THROTTLE;
                                return Ok(ConnCtx {
                                    client_id,
                                    name_tag,
                                    outbound_rx,
                                    msgs_in,
                                    msgs_out: 1,
                                    bytes_in,
                                    bytes_out: 0,
                                    invalid_json,
                                    last_act_full_log: now,
                                    last_lag_log: now,
                                    last_invalid_log: now,
                                    close_frame: None,
                                });
                            }
                            Err(err) => {
                                info!(
                                    name = %payload.client_name,
                                    cause = err.cause(),
                                    "admission refused"
                                );
                                let res =
                                    ServerMessage::ConnRes(ConnResDto::restricted(err.cause()));
                                send_message(socket, &res).await?;
                                if err.closes_connection() {
                                    let _ = socket.close().await;
                                    return Err(NetError::ClosedBeforeAdmission);
                                }
                            }
                        }
                    }
                    Ok(_) => {
                        // Everything except `conn` is premature on an
                        // unregistered socket.
                        send_message(socket, &ServerMessage::NotReg).await?;
                    }
                    Err(parse_err) => {
                        invalid_json += 1;
                        if should_log(&mut last_invalid_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse message before admission"
                            );
                        }
                        if invalid_json > MAX_INVALID_JSON {
                            let _ = send_close_with_reason(
                                socket,
                                close_code::POLICY,
                                "too many invalid messages",
                            )
                            .await;
                            return Err(NetError::ClosedBeforeAdmission);
                        }
                    }
                }
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::ClosedBeforeAdmission);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeAdmission),
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    ctx: &mut ConnCtx,
) -> Result<(), NetError> {
    let client_id = ctx.client_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        name_tag,
        outbound_rx,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_act_full_log,
        last_lag_log,
        last_invalid_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    socket,
                    incoming,
                    state,
                    client_id,
                    name_tag,
                    msgs_in,
                    msgs_out,
                    bytes_in,
                    bytes_out,
                    invalid_json,
                    last_act_full_log,
                    last_invalid_log,
                    close_frame,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            frame = outbound_rx.recv() => {
                match frame {
                    Ok(frame) => match forward_frame(frame, client_id, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_lag_log) {
                            warn!(missed = n, "outbound frames lagged; requesting resync");
                        }
                        // Resync strategy: the scene owes this client a full
                        // snapshot on its next tick.
                        let _ = state.command_tx.try_send(SceneCommand::Sync { client_id });
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::OutboundClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(
        state,
        client_id,
        *msgs_in,
        *msgs_out,
        *bytes_in,
        *bytes_out,
        *invalid_json,
    )
    .await
    {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    state: &Arc<AppState>,
    client_id: ClientId,
    name_tag: &str,
    msgs_in: &mut u64,
    msgs_out: &mut u64,
    bytes_in: &mut u64,
    bytes_out: &mut u64,
    invalid_json: &mut u32,
    last_act_full_log: &mut Instant,
    last_invalid_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;
                state.registry.touch(client_id).await;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Conn(payload)) => {
                        // Re-registration runs the same chain; the socket only
                        // survives the already-registered refusal.
                        let Err(err) = state.registry.admit(&payload.client_name, true).await
                        else {
                            return Ok(LoopControl::Continue);
                        };
                        let res = ServerMessage::ConnRes(ConnResDto::restricted(err.cause()));
                        *msgs_out += 1;
                        *bytes_out += send_message(socket, &res).await? as u64;
                        if err.closes_connection() {
                            return Ok(LoopControl::Disconnect);
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::ClientAct(payload)) => {
                        // The wire-level clientID is untrusted; the admitted
                        // identity of this socket stands in for it.
                        let command = SceneCommand::Action {
                            client_id,
                            code: payload.data.code,
                            status: payload.data.status,
                        };
                        match state.command_tx.try_send(command) {
                            Ok(()) => Ok(LoopControl::Continue),
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                if should_log(last_act_full_log) {
                                    warn!("command channel full; dropping input");
                                }
                                Ok(LoopControl::Continue)
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                Err(NetError::CommandsClosed)
                            }
                        }
                    }
                    Ok(ClientMessage::ClientChat(payload)) => {
                        let trimmed = payload.message.trim();
                        if trimmed.is_empty() {
                            return Ok(LoopControl::Continue);
                        }
                        let message: String = trimmed.chars().take(MAX_CHAT_CHARS).collect();
                        let chat = ServerMessage::ServerChat(ServerChatDto {
                            sender: name_tag.to_string(),
                            message,
                        });
                        let bytes = serialize_message(&chat).map_err(NetError::Serialization)?;
                        // Chat fans out through the shared outbound channel and
                        // never touches the scene.
                        let _ = state.outbound_tx.send(OutboundFrame {
                            target: Target::All,
                            bytes,
                        });
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::ClientSceneMeta(_)) => {
                        let meta = ServerMessage::ServerSceneMeta(SceneMetaDto {
                            stage_system_name: state.stage_meta.stage_system_name.clone(),
                            grid_size: state.stage_meta.grid_size,
                            curr_player_count: state.registry.count().await,
                            max_player_count: state.registry.max_players(),
                        });
                        *msgs_out += 1;
                        *bytes_out += send_message(socket, &meta).await? as u64;
                        Ok(LoopControl::Continue)
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_frame(
    frame: OutboundFrame,
    client_id: ClientId,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let mine = match frame.target {
        Target::All => true,
        Target::Client(id) => id == client_id,
    };
    if !mine {
        return LoopControl::Continue;
    }

    let bytes_len = frame.bytes.len();
    match socket
        .send(Message::Text(frame.bytes))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to forward frame");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(
    state: &Arc<AppState>,
    client_id: ClientId,
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
) -> Result<(), NetError> {
    // The scene despawns the avatar and cancels any pending respawn.
    state
        .command_tx
        .send(SceneCommand::Disconnect { client_id })
        .await
        .map_err(|_| NetError::CommandsClosed)?;

    state.registry.remove(client_id).await;

    debug!(
        msgs_in,
        msgs_out, bytes_in, bytes_out, invalid_json, "connection stats"
    );
    info!("client disconnected");
    Ok(())
}
