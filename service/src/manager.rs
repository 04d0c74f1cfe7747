//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Session manager implementation
//!
//! The SessionManager is responsible for:
//! - Spawning a session task per accepted connection
//! - Tracking live sessions and enforcing the session limit
//! - Graceful shutdown coordination

use crate::session::{ControlMessage, ServerSession};
use crate::transport::split;
use crate::types::{SessionId, SessionInfo};
use crate::{Result, ServerConfig, SessionError, TelnetConnection};
use dashmap::DashMap;
use metrics::{counter, gauge};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use teletty_telnetcodec::{Role, ServerResolver};
use teletty_terminal::{PtyHost, PtyTerminal};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How long shutdown waits for sessions to finish
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Managed session entry
struct ManagedSession {
    info: SessionInfo,
    control_tx: mpsc::Sender<ControlMessage>,
    handle: Option<JoinHandle<()>>,
}

/// Session manager
pub struct SessionManager {
    /// Live sessions (lock-free concurrent map)
    sessions: Arc<DashMap<SessionId, ManagedSession>>,
    /// Next session ID (monotonically increasing)
    next_id: AtomicU64,
    /// Host starting each session's login program
    host: Arc<dyn PtyHost>,
    config: ServerConfig,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(config: ServerConfig, host: Arc<dyn PtyHost>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            host,
            config,
        }
    }

    /// Get the next session ID
    fn next_session_id(&self) -> SessionId {
        SessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Start a session on an accepted stream
    ///
    /// Fails without touching the stream when the session limit is reached.
    pub fn add_session<S>(&self, stream: S, peer_addr: SocketAddr) -> Result<SessionId>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        if let Some(max) = self.config.max_sessions {
            if self.sessions.len() >= max {
                return Err(SessionError::MaxSessionsReached(max));
            }
        }

        let id = self.next_session_id();
        let (reader, writer) = split(stream, self.config.read_buffer_size);
        let connection = TelnetConnection::new(
            reader,
            writer,
            Role::Server(ServerResolver::new(&self.config.default_terminal_type)),
        );
        let terminal = PtyTerminal::new(
            self.host.clone(),
            &self.config.login_program,
            &self.config.login_args,
        );
        let (session, control_tx) = ServerSession::new(
            id,
            peer_addr,
            connection,
            terminal,
            &self.config.default_terminal_type,
        );

        self.sessions.insert(
            id,
            ManagedSession {
                info: SessionInfo {
                    id,
                    peer_addr,
                    started_at: Instant::now(),
                },
                control_tx,
                handle: None,
            },
        );
        counter!("teletty.sessions.accepted").increment(1);
        gauge!("teletty.sessions.active").increment(1.0);

        let sessions = self.sessions.clone();
        let handle = tokio::spawn(async move {
            match session.run().await {
                Ok(()) => info!(session = %id, "Session closed"),
                Err(error) => {
                    counter!("teletty.sessions.failed").increment(1);
                    warn!(session = %id, "Session failed: {}", error);
                }
            }
            sessions.remove(&id);
            gauge!("teletty.sessions.active").decrement(1.0);
        });
        if let Some(mut entry) = self.sessions.get_mut(&id) {
            entry.handle = Some(handle);
        }

        Ok(id)
    }

    /// Ask a session to close
    pub async fn close_session(&self, id: SessionId) -> Result<()> {
        let info = self
            .session_info(id)
            .ok_or(SessionError::SessionNotFound(id))?;
        info!(
            session = %id,
            peer = %info.peer_addr,
            duration = ?info.duration(),
            "Closing session"
        );
        let control_tx = self
            .sessions
            .get(&id)
            .map(|entry| entry.control_tx.clone())
            .ok_or(SessionError::SessionNotFound(id))?;
        control_tx
            .send(ControlMessage::Close)
            .await
            .map_err(|_| SessionError::ConnectionClosed)
    }

    /// Get session info
    pub fn session_info(&self, id: SessionId) -> Option<SessionInfo> {
        self.sessions.get(&id).map(|entry| entry.info.clone())
    }

    /// Get all session infos
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|entry| entry.value().info.clone())
            .collect()
    }

    /// Get the number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Get the number of sessions started so far
    pub fn total_sessions(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst) - 1
    }

    /// Close all sessions and wait for them to finish
    pub async fn shutdown(&self) {
        for info in self.sessions() {
            info!(
                session = %info.id,
                peer = %info.peer_addr,
                duration = ?info.duration(),
                "Closing session"
            );
        }
        let mut handles = Vec::new();
        let mut controls = Vec::new();
        for mut entry in self.sessions.iter_mut() {
            controls.push(entry.control_tx.clone());
            if let Some(handle) = entry.handle.take() {
                handles.push(handle);
            }
        }
        for control_tx in controls {
            let _ = control_tx.send(ControlMessage::Close).await;
        }

        for handle in handles {
            let abort = handle.abort_handle();
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                warn!("Session did not stop in time, aborting");
                abort.abort();
            }
        }
        self.sessions.clear();
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session_count", &self.session_count())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
