use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which flavour of instrument endpoint a connection drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// RSN DIGI: framed data port plus a text command port.
    Rsn,
    /// Raw TCP instrument: unframed data port plus a command port.
    Tcp,
}

impl ConnectionKind {
    /// Policy used when none is given explicitly.
    pub fn default_policy(self) -> ConnectedPolicy {
        match self {
            ConnectionKind::Rsn => ConnectedPolicy::DataOnly,
            ConnectionKind::Tcp => ConnectedPolicy::DataAndCommand,
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::Rsn => f.write_str("rsn"),
            ConnectionKind::Tcp => f.write_str("tcp"),
        }
    }
}

/// What `connected()` requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectedPolicy {
    /// Only the data socket must be up.
    DataOnly,
    /// Both the data and the command socket must be up.
    DataAndCommand,
}

/// Bounds for synchronous command/response exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    /// Sleep between polls of the command socket.
    pub tick: Duration,
    /// Polls before a response is declared missing.
    pub max_ticks: u32,
    /// Largest response (or echoed command) that can be awaited.
    pub buffer_capacity: usize,
}

impl CommandConfig {
    /// Nominal wall-clock budget of one response wait.
    pub fn timeout(&self) -> Duration {
        self.tick.saturating_mul(self.max_ticks)
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            max_ticks: 30,
            buffer_capacity: 1000,
        }
    }
}

/// Text protocol spoken on a DIGI command port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigiProtocol {
    /// Greeting sent by the DIGI right after connect.
    pub banner: String,
    /// Command that switches the DIGI to binary timestamping.
    pub timestamping_command: String,
    /// Acknowledgement of `timestamping_command`.
    pub timestamping_ack: String,
    /// Whether the DIGI echoes each command line before answering.
    pub command_echo: bool,
    /// Terminator appended to every command.
    pub line_ending: String,
}

impl DigiProtocol {
    /// Command line for a serial break of `duration_ms` milliseconds.
    pub fn break_command(&self, duration_ms: u32) -> String {
        format!("break {duration_ms}")
    }

    /// Acknowledgement of a serial break of `duration_ms` milliseconds.
    pub fn break_ack(&self, duration_ms: u32) -> String {
        format!("Sending Serial Break {duration_ms}(ms)\r\n\r\n")
    }
}

impl Default for DigiProtocol {
    fn default() -> Self {
        Self {
            banner: "OOI - Digi Command Interface\r\ntype help for command information\r\n"
                .to_string(),
            timestamping_command: "timestamping 2".to_string(),
            timestamping_ack: "Set Timestamping:On(binary)\r\n\r\n".to_string(),
            command_echo: true,
            line_ending: "\r\n".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policies_per_kind() {
        assert_eq!(
            ConnectionKind::Rsn.default_policy(),
            ConnectedPolicy::DataOnly
        );
        assert_eq!(
            ConnectionKind::Tcp.default_policy(),
            ConnectedPolicy::DataAndCommand
        );
    }

    #[test]
    fn default_command_budget_is_three_seconds() {
        let config = CommandConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.buffer_capacity, 1000);
    }

    #[test]
    fn break_strings_carry_duration() {
        let protocol = DigiProtocol::default();
        assert_eq!(protocol.break_command(250), "break 250");
        assert_eq!(
            protocol.break_ack(250),
            "Sending Serial Break 250(ms)\r\n\r\n"
        );
    }

    #[test]
    fn protocol_fields_default_when_missing() {
        let protocol: DigiProtocol =
            serde_json::from_str(r#"{"command_echo": false}"#).expect("partial protocol parses");
        assert!(!protocol.command_echo);
        assert_eq!(protocol.banner, DigiProtocol::default().banner);
    }

    #[test]
    fn kind_names_are_lowercase() {
        let kind: ConnectionKind = serde_json::from_str("\"rsn\"").expect("kind parses");
        assert_eq!(kind, ConnectionKind::Rsn);
        assert_eq!(ConnectionKind::Tcp.to_string(), "tcp");
    }
}
