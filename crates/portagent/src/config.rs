use std::path::Path;
use std::time::Duration;

use portagent_connection::{
    CommandConfig, ConnectedPolicy, ConnectionKind, DigiProtocol, TcpInstrumentConnection,
};
use serde::Deserialize;

use crate::exit::{connection_error, io_error, CliError, CliResult, DATA_INVALID};

/// Connection settings read from a JSON file. Every field is optional;
/// command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub kind: Option<ConnectionKind>,
    pub data_host: Option<String>,
    pub data_port: Option<u16>,
    pub command_host: Option<String>,
    pub command_port: Option<u16>,
    pub connected_policy: Option<ConnectedPolicy>,
    pub tick_ms: Option<u64>,
    pub max_ticks: Option<u32>,
    pub protocol: Option<DigiProtocol>,
}

impl AgentConfig {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read config {}", path.display()), err))?;
        Self::from_json(&text)
            .map_err(|err| CliError::new(DATA_INVALID, format!("{}: {err}", path.display())))
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Fill unset fields from `other`.
    pub fn or(self, other: AgentConfig) -> AgentConfig {
        AgentConfig {
            kind: self.kind.or(other.kind),
            data_host: self.data_host.or(other.data_host),
            data_port: self.data_port.or(other.data_port),
            command_host: self.command_host.or(other.command_host),
            command_port: self.command_port.or(other.command_port),
            connected_policy: self.connected_policy.or(other.connected_policy),
            tick_ms: self.tick_ms.or(other.tick_ms),
            max_ticks: self.max_ticks.or(other.max_ticks),
            protocol: self.protocol.or(other.protocol),
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind.unwrap_or(ConnectionKind::Rsn)
    }

    pub fn command_config(&self) -> CommandConfig {
        let defaults = CommandConfig::default();
        CommandConfig {
            tick: self
                .tick_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick),
            max_ticks: self.max_ticks.unwrap_or(defaults.max_ticks),
            ..defaults
        }
    }

    /// Build a configured, not yet initialized connection.
    pub fn connection(&self) -> CliResult<TcpInstrumentConnection> {
        let kind = self.kind();
        let mut conn = TcpInstrumentConnection::new(kind)
            .with_command_config(self.command_config())
            .with_protocol(self.protocol.clone().unwrap_or_default())
            .with_connected_policy(self.connected_policy.unwrap_or(kind.default_policy()));

        let configure = |err| connection_error("configure", err);
        if let Some(host) = &self.data_host {
            conn.set_data_host(host).map_err(configure)?;
        }
        if let Some(port) = self.data_port {
            conn.set_data_port(port).map_err(configure)?;
        }
        if let Some(host) = &self.command_host {
            conn.set_command_host(host).map_err(configure)?;
        }
        if let Some(port) = self.command_port {
            conn.set_command_port(port).map_err(configure)?;
        }
        Ok(conn)
    }
}
