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

//! Telnet server implementation
//!
//! The TelnetServer owns the TCP listener, accepts connections and hands them to the
//! SessionManager, which logs each client into its own pty.

use crate::types::ServerSnapshot;
use crate::{Result, ServerConfig, SessionError, SessionManager};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use teletty_terminal::{NativePtyHost, PtyHost};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Back-off after a failed accept
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Telnet server
///
/// # Example
///
/// ```no_run
/// use teletty_service::{ServerConfig, TelnetServer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::new("0.0.0.0:2323".parse()?);
///     let server = TelnetServer::bind(config).await?;
///
///     server.start().await?;
///     tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///
///     Ok(())
/// }
/// ```
pub struct TelnetServer {
    /// Session manager
    manager: Arc<SessionManager>,
    /// TCP listener shared with the accept loop
    listener: Arc<TcpListener>,
    /// Actual bind address
    local_addr: SocketAddr,
    /// Server start time
    started_at: Instant,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Shutdown notification
    shutdown_notify: Arc<Notify>,
    /// Accept loop task handle
    accept_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TelnetServer {
    /// Bind a server running the login program on the system's ptys
    ///
    /// This binds to the configured address but does not start accepting connections.
    /// Call `start()` to begin accepting connections.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        Self::bind_with_host(config, Arc::new(NativePtyHost)).await
    }

    /// Bind a server whose sessions run on `host`
    pub async fn bind_with_host(config: ServerConfig, host: Arc<dyn PtyHost>) -> Result<Self> {
        config.validate().map_err(SessionError::Config)?;

        let listener = TcpListener::bind(config.bind_address).await?;
        let local_addr = listener.local_addr()?;
        info!("Telnet server bound to {}", local_addr);

        Ok(Self {
            manager: Arc::new(SessionManager::new(config, host)),
            listener: Arc::new(listener),
            local_addr,
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            accept_handle: Mutex::new(None),
        })
    }

    /// Start accepting connections
    ///
    /// The accept loop runs on its own task until `shutdown()` is called.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Other("Server already running".to_string()));
        }

        info!("Starting Telnet server on {}", self.local_addr);
        let handle = self.spawn_accept_loop();
        *self.accept_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Spawn the accept loop task
    fn spawn_accept_loop(&self) -> JoinHandle<()> {
        let listener = self.listener.clone();
        let manager = self.manager.clone();
        let running = self.running.clone();
        let shutdown_notify = self.shutdown_notify.clone();

        tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                let accepted = tokio::select! {
                    result = listener.accept() => result,
                    () = shutdown_notify.notified() => break,
                };

                match accepted {
                    Ok((socket, peer_addr)) => {
                        debug!("Accepted connection from {}", peer_addr);
                        if let Err(e) = socket.set_nodelay(true) {
                            debug!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
                        }
                        match manager.add_session(socket, peer_addr) {
                            Ok(id) => info!("Session {} established from {}", id, peer_addr),
                            Err(e) => {
                                warn!("Rejecting connection from {}: {}", peer_addr, e);
                                metrics::counter!("teletty.sessions.rejected").increment(1);
                            }
                        }
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        // Back off on errors to avoid a tight loop
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }

            info!("Accept loop terminated");
        })
    }

    /// Stop accepting connections and close all sessions
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(SessionError::ServerNotRunning);
        }

        info!("Shutting down {}", self.snapshot());
        self.shutdown_notify.notify_one();

        if let Some(handle) = self.accept_handle.lock().await.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
                abort.abort();
            }
        }

        self.manager.shutdown().await;
        info!("Telnet server shutdown complete");
        Ok(())
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the server's bind address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get the number of live sessions
    pub fn session_count(&self) -> usize {
        self.manager.session_count()
    }

    /// Get the session manager
    pub fn manager(&self) -> Arc<SessionManager> {
        self.manager.clone()
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_sessions: self.manager.session_count(),
            total_sessions: self.manager.total_sessions(),
            bind_address: self.local_addr,
            uptime: self.started_at.elapsed(),
        }
    }
}

impl std::fmt::Debug for TelnetServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetServer")
            .field("local_addr", &self.local_addr)
            .field("running", &self.is_running())
            .field("session_count", &self.session_count())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

// Stop the accept loop if the server is dropped while running
impl Drop for TelnetServer {
    fn drop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            warn!("TelnetServer dropped while still running");
            self.shutdown_notify.notify_one();
        }
    }
}
