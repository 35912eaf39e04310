use crate::router::MessageRouter;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod backoff;

pub use backoff::{Backoff, FixedBackoff};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// A command frame headed for the game process. Fire-and-forget: nothing
/// correlates it with a later `command_result` frame.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundCommand {
    #[serde(rename = "type")]
    kind: &'static str,
    pub command: String,
    pub parameters: serde_json::Value,
    pub reason: String,
}

impl OutboundCommand {
    pub fn new(
        command: impl Into<String>,
        parameters: serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind: "command",
            command: command.into(),
            parameters,
            reason: reason.into(),
        }
    }
}

/// The live transport to the game process. State and write half sit
/// behind one lock so the send guard and a state transition are a single
/// check-then-act.
struct Connection {
    state: LinkState,
    writer: Option<OwnedWriteHalf>,
}

/// Reconnecting bidirectional link to the game process. One JSON object
/// per newline-terminated frame; inbound frames go to the router, outbound
/// commands come in through [`MessageLink::send`].
pub struct MessageLink {
    addr: String,
    router: MessageRouter,
    backoff: Box<dyn Backoff>,
    running: AtomicBool,
    conn: Mutex<Connection>,
}

impl MessageLink {
    pub fn new(addr: impl Into<String>, router: MessageRouter, backoff: Box<dyn Backoff>) -> Self {
        Self {
            addr: addr.into(),
            router,
            backoff,
            running: AtomicBool::new(true),
            conn: Mutex::new(Connection {
                state: LinkState::Disconnected,
                writer: None,
            }),
        }
    }

    pub async fn state(&self) -> LinkState {
        self.conn.lock().await.state
    }

    /// Perpetual connect/receive loop. Establishes the transport, feeds
    /// every parseable inbound frame to the router, and on any transport
    /// failure waits out the backoff delay and starts over. Exits only
    /// when [`MessageLink::stop`] has been called.
    pub async fn connect(&self) {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            self.set_state(LinkState::Connecting).await;
            match TcpStream::connect(&self.addr).await {
                Ok(stream) => {
                    info!(addr = %self.addr, "link established");
                    let (read_half, write_half) = stream.into_split();
                    let accepted = {
                        let mut conn = self.conn.lock().await;
                        if conn.state == LinkState::Closing {
                            false
                        } else {
                            conn.writer = Some(write_half);
                            conn.state = LinkState::Connected;
                            true
                        }
                    };
                    if !accepted {
                        break;
                    }
                    self.receive_loop(read_half).await;
                    self.drop_connection().await;
                }
                Err(err) => {
                    warn!(addr = %self.addr, %err, "link connect failed");
                    self.set_state(LinkState::Disconnected).await;
                }
            }

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(self.backoff.delay()).await;
        }
        self.drop_connection().await;
        info!("link loop exited");
    }

    async fn receive_loop(&self, read_half: tokio::net::tcp::OwnedReadHalf) {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<serde_json::Value>(line) {
                        Ok(frame) => self.router.dispatch(frame).await,
                        Err(err) => warn!(%err, "dropping unparseable frame"),
                    }
                }
                Ok(None) => {
                    warn!("link closed by remote");
                    break;
                }
                Err(err) => {
                    warn!(%err, "link read failed");
                    break;
                }
            }
        }
    }

    /// Serialize and write one command frame. Returns false instead of
    /// raising on every failure path: not connected, encode error, or a
    /// write error (which also tears the connection down for the receive
    /// loop to notice). Commands issued while disconnected are dropped,
    /// not queued; replaying stale commands after a reconnect is worse
    /// than losing them.
    pub async fn send(
        &self,
        command: &str,
        parameters: serde_json::Value,
        reason: &str,
    ) -> bool {
        let frame = OutboundCommand::new(command, parameters, reason);
        let mut payload = match serde_json::to_vec(&frame) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(command, %err, "failed to encode command");
                return false;
            }
        };
        payload.push(b'\n');

        let mut conn = self.conn.lock().await;
        if conn.state != LinkState::Connected {
            debug!(command, state = ?conn.state, "dropping command, link not connected");
            return false;
        }
        let Some(writer) = conn.writer.as_mut() else {
            return false;
        };

        if let Err(err) = writer.write_all(&payload).await {
            warn!(command, %err, "command write failed");
            conn.writer = None;
            conn.state = LinkState::Disconnected;
            return false;
        }
        if let Err(err) = writer.flush().await {
            warn!(command, %err, "command flush failed");
            conn.writer = None;
            conn.state = LinkState::Disconnected;
            return false;
        }
        true
    }

    /// Cooperative shutdown: the connect loop exits at its next loop-top
    /// check. An in-progress blocking receive is not interrupted.
    /// Idempotent.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut conn = self.conn.lock().await;
        conn.state = LinkState::Closing;
        conn.writer = None;
        info!("link stopping");
    }

    // Closing is sticky: once stop() has marked it, the winding-down
    // loop iteration must not flip the state back.
    async fn set_state(&self, state: LinkState) {
        let mut conn = self.conn.lock().await;
        if conn.state != LinkState::Closing {
            conn.state = state;
        }
    }

    async fn drop_connection(&self) {
        let mut conn = self.conn.lock().await;
        conn.writer = None;
        if conn.state != LinkState::Closing {
            conn.state = LinkState::Disconnected;
        }
    }
}
