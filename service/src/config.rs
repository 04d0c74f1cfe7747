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

//! Session configuration
//!
//! # Examples
//!
//! ## Server Configuration
//!
//! ```
//! use teletty_service::ServerConfig;
//!
//! let config = ServerConfig::new("127.0.0.1:2323".parse().unwrap())
//!     .with_login_program("/bin/sh")
//!     .with_max_sessions(Some(16));
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Client Configuration
//!
//! ```
//! use teletty_service::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("127.0.0.1", 2323)
//!     .with_terminal_type(Some("xterm".to_string()))
//!     .with_connect_timeout(Duration::from_secs(3));
//! assert_eq!(config.address(), "127.0.0.1:2323");
//! ```

use std::net::SocketAddr;
use std::time::Duration;
use teletty_telnetcodec::TerminalSpeed;

/// Default Telnet port
pub const DEFAULT_PORT: u16 = 23;

/// Default read buffer capacity for socket reads
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Program started on each session's pty
    pub login_program: String,

    /// Arguments passed to the login program
    pub login_args: Vec<String>,

    /// Terminal type used when the client does not negotiate one
    pub default_terminal_type: String,

    /// Capacity of each socket read
    pub read_buffer_size: usize,

    /// Maximum number of concurrent sessions, unbounded when `None`
    pub max_sessions: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            login_program: "login".to_string(),
            login_args: Vec::new(),
            default_terminal_type: "vt100".to_string(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_sessions: None,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given bind address
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn with_bind_address(mut self, address: SocketAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// Set the login program
    pub fn with_login_program(mut self, program: impl Into<String>) -> Self {
        self.login_program = program.into();
        self
    }

    /// Set the login program's arguments
    pub fn with_login_args(mut self, args: Vec<String>) -> Self {
        self.login_args = args;
        self
    }

    /// Set the fallback terminal type
    pub fn with_default_terminal_type(mut self, terminal_type: impl Into<String>) -> Self {
        self.default_terminal_type = terminal_type.into();
        self
    }

    /// Set the read buffer size
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the session limit
    pub fn with_max_sessions(mut self, max: Option<usize>) -> Self {
        self.max_sessions = max;
        self
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.login_program.trim().is_empty() {
            return Err("login_program must not be empty".to_string());
        }

        if self.default_terminal_type.is_empty()
            || !self
                .default_terminal_type
                .bytes()
                .all(|b| b.is_ascii_graphic())
        {
            return Err("default_terminal_type must be a printable ASCII name".to_string());
        }

        if self.read_buffer_size == 0 {
            return Err("read_buffer_size must be greater than 0".to_string());
        }

        if self.max_sessions == Some(0) {
            return Err("max_sessions must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Terminal type to announce, derived from `$TERM` when `None`
    pub terminal_type: Option<String>,

    /// Line speed to announce
    pub terminal_speed: TerminalSpeed,

    /// Capacity of each socket read
    pub read_buffer_size: usize,

    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            terminal_type: None,
            terminal_speed: TerminalSpeed::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration with the given host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the terminal type
    pub fn with_terminal_type(mut self, terminal_type: Option<String>) -> Self {
        self.terminal_type = terminal_type;
        self
    }

    /// Set the terminal speed
    pub fn with_terminal_speed(mut self, speed: TerminalSpeed) -> Self {
        self.terminal_speed = speed;
        self
    }

    /// Set the read buffer size
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Address in `host:port` form, with IPv6 hosts in brackets
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }

        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        if self.read_buffer_size == 0 {
            return Err("read_buffer_size must be greater than 0".to_string());
        }

        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:23".parse().unwrap());
        assert_eq!(config.login_program, "login");
        assert_eq!(config.default_terminal_type, "vt100");
        assert_eq!(config.read_buffer_size, 4096);
        assert_eq!(config.max_sessions, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_builder_pattern() {
        let config = ServerConfig::default()
            .with_login_program("/bin/sh")
            .with_login_args(vec!["-i".to_string()])
            .with_default_terminal_type("ansi")
            .with_max_sessions(Some(8));

        assert_eq!(config.login_program, "/bin/sh");
        assert_eq!(config.login_args, vec!["-i".to_string()]);
        assert_eq!(config.default_terminal_type, "ansi");
        assert_eq!(config.max_sessions, Some(8));
    }

    #[test]
    fn test_server_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.max_sessions = Some(0);
        assert!(config.validate().is_err());

        config.max_sessions = None;
        config.login_program = " ".to_string();
        assert!(config.validate().is_err());

        config.login_program = "login".to_string();
        config.default_terminal_type = "vt 100".to_string();
        assert!(config.validate().is_err());

        config.default_terminal_type = "vt100".to_string();
        config.read_buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_client_config() {
        let config = ClientConfig::default();
        assert_eq!(config.address(), "0.0.0.0:23");
        assert_eq!(config.terminal_speed, TerminalSpeed::new(38400, 38400));
        assert_eq!(config.terminal_type, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_address_forms() {
        assert_eq!(ClientConfig::new("example.com", 2323).address(), "example.com:2323");
        assert_eq!(ClientConfig::new("::1", 23).address(), "[::1]:23");
        assert_eq!(ClientConfig::new("[::1]", 23).address(), "[::1]:23");
    }

    #[test]
    fn test_client_validation() {
        assert!(ClientConfig::new("", 23).validate().is_err());
        assert!(ClientConfig::new("localhost", 0).validate().is_err());
        assert!(
            ClientConfig::new("localhost", 23)
                .with_connect_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            ClientConfig::new("localhost", 23)
                .with_read_buffer_size(0)
                .validate()
                .is_err()
        );
    }
}
