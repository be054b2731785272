use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use portagent_connection::{ConnectedPolicy, ConnectionKind};
use portagent_packet::PacketKind;
use portagent_publisher::PublisherFormat;

use crate::config::AgentConfig;
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod serial_break;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to an instrument and print framed data packets.
    Stream(StreamArgs),
    /// Send a serial break through an RSN DIGI command port.
    Break(BreakArgs),
    /// Decode a packet capture file.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Stream(args) => stream::run(args, format),
        Command::Break(args) => serial_break::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Rsn,
    Tcp,
}

impl From<KindArg> for ConnectionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Rsn => ConnectionKind::Rsn,
            KindArg::Tcp => ConnectionKind::Tcp,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    DataOnly,
    DataAndCommand,
}

impl From<PolicyArg> for ConnectedPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::DataOnly => ConnectedPolicy::DataOnly,
            PolicyArg::DataAndCommand => ConnectedPolicy::DataAndCommand,
        }
    }
}

/// Instrument endpoint settings shared by the connecting commands.
#[derive(Args, Debug, Default)]
pub struct ConnectArgs {
    /// JSON file with connection settings. Flags override its values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Instrument flavour.
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,
    /// Data port host.
    #[arg(long)]
    pub data_host: Option<String>,
    /// Data port number.
    #[arg(long)]
    pub data_port: Option<u16>,
    /// Command port host.
    #[arg(long)]
    pub command_host: Option<String>,
    /// Command port number.
    #[arg(long)]
    pub command_port: Option<u16>,
    /// What counts as connected.
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,
    /// Command poll interval in milliseconds.
    #[arg(long, value_name = "MS")]
    pub tick_ms: Option<u64>,
    /// Command polls before giving up on a response.
    #[arg(long)]
    pub max_ticks: Option<u32>,
}

impl ConnectArgs {
    /// Flags layered over the config file, if any.
    pub fn resolve(&self) -> CliResult<AgentConfig> {
        let flags = AgentConfig {
            kind: self.kind.map(Into::into),
            data_host: self.data_host.clone(),
            data_port: self.data_port,
            command_host: self.command_host.clone(),
            command_port: self.command_port,
            connected_policy: self.policy.map(Into::into),
            tick_ms: self.tick_ms,
            max_ticks: self.max_ticks,
            protocol: None,
        };

        match &self.config {
            Some(path) => Ok(flags.or(AgentConfig::load(path)?)),
            None => Ok(flags),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FileFormatArg {
    Binary,
    Ascii,
    Pretty,
}

impl From<FileFormatArg> for PublisherFormat {
    fn from(format: FileFormatArg) -> Self {
        match format {
            FileFormatArg::Binary => PublisherFormat::Binary,
            FileFormatArg::Ascii => PublisherFormat::Ascii,
            FileFormatArg::Pretty => PublisherFormat::Pretty,
        }
    }
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Exit after N packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Also append packets to this file.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Rendering used for --output.
    #[arg(long, value_enum, default_value = "binary")]
    pub output_format: FileFormatArg,
    /// Forward binary packets to a driver listening at HOST:PORT.
    #[arg(long, value_name = "HOST:PORT")]
    pub forward: Option<String>,
    /// Also log every packet at info level.
    #[arg(long)]
    pub log_packets: bool,
    /// Data socket poll interval in milliseconds when idle.
    #[arg(long, value_name = "MS", default_value = "10")]
    pub poll_ms: u64,
}

#[derive(Args, Debug)]
pub struct BreakArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Break length in milliseconds.
    #[arg(long, short = 'd', default_value = "500")]
    pub duration: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CaptureKind {
    Rsn,
    PortAgent,
    Generic,
}

impl From<CaptureKind> for PacketKind {
    fn from(kind: CaptureKind) -> Self {
        match kind {
            CaptureKind::Rsn => PacketKind::Rsn,
            CaptureKind::PortAgent => PacketKind::PortAgent,
            CaptureKind::Generic => PacketKind::Generic,
        }
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to read ("-" for stdin).
    pub path: PathBuf,
    /// Packet kind recorded in the capture.
    #[arg(long, value_enum, default_value = "port-agent")]
    pub kind: CaptureKind,
    /// Fail with exit code 60 if any checksum does not match.
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
