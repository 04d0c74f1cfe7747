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

//! Teletty command line: a Telnet client by default, a login server with `-s`.

use clap::Parser;
use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::time::Duration;
use teletty_service::{
    ClientConfig, DEFAULT_PORT, ServerConfig, SessionError, TelnetClient, TelnetServer,
};
use tracing::{error, info};

/// How long the runtime waits for blocking tasks at exit
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

/// Telnet remote login client and server.
#[derive(Debug, Parser)]
#[command(name = "teletty", version)]
struct Cli {
    /// Address to connect to, or to listen on with -s
    #[arg(long, value_name = "ADDRESS", default_value = "0.0.0.0")]
    ip: String,

    /// Port to connect to, or to listen on with -s
    #[arg(long, value_name = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Run as a server
    #[arg(short = 's')]
    server: bool,
}

/// Rewrite the single dash spellings `-ip` and `-port` into their long form.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            for flag in ["-ip", "-port"] {
                if text == flag || text.starts_with(&format!("{flag}=")) {
                    return OsString::from(format!("-{text}"));
                }
            }
            arg
        })
        .collect()
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run_server(cli: &Cli) -> teletty_service::Result<()> {
    let ip: IpAddr = cli
        .ip
        .parse()
        .map_err(|error| SessionError::Config(format!("invalid address {}: {error}", cli.ip)))?;
    let server = TelnetServer::bind(ServerConfig::new(SocketAddr::new(ip, cli.port))).await?;
    server.start().await?;
    info!("Listening on {}", server.local_addr());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    server.shutdown().await
}

async fn run_client(cli: &Cli) -> teletty_service::Result<()> {
    TelnetClient::new(ClientConfig::new(cli.ip.clone(), cli.port))?
        .run()
        .await
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    init_tracing();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            error!("Failed to start runtime: {}", error);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        if cli.server {
            run_server(&cli).await
        } else {
            run_client(&cli).await
        }
    });
    // The keyboard reader blocks in read(2) and cannot be joined.
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{}", error);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_args(args.iter().map(OsString::from))).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["teletty"]);
        assert_eq!(cli.ip, "0.0.0.0");
        assert_eq!(cli.port, 23);
        assert!(!cli.server);
    }

    #[test]
    fn test_single_dash_flags() {
        let cli = parse(&["teletty", "-ip", "10.0.0.7", "-port", "2323", "-s"]);
        assert_eq!(cli.ip, "10.0.0.7");
        assert_eq!(cli.port, 2323);
        assert!(cli.server);
    }

    #[test]
    fn test_double_dash_and_equals_flags() {
        let cli = parse(&["teletty", "--ip", "::1", "-port=2424"]);
        assert_eq!(cli.ip, "::1");
        assert_eq!(cli.port, 2424);
    }

    #[test]
    fn test_only_exact_flags_are_rewritten() {
        let args = normalize_args(["teletty", "-ip", "-port"].map(OsString::from));
        assert_eq!(args, ["teletty", "--ip", "--port"].map(OsString::from));
        let args = normalize_args(["teletty", "-s", "-ipv6"].map(OsString::from));
        assert_eq!(args, ["teletty", "-s", "-ipv6"].map(OsString::from));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let args = normalize_args(["teletty", "-port", "70000"].map(OsString::from));
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
