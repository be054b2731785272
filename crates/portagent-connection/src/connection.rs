use bytes::BytesMut;
use portagent_packet::{decode_packet, Packet, PacketKind, PacketType, Timestamp, MAX_PAYLOAD_SIZE};
use portagent_transport::{CommSocket, TransportError};
use tracing::{debug, error, info, warn};

use crate::command::{await_echo, await_response_from, EchoOutcome};
use crate::config::{CommandConfig, ConnectedPolicy, ConnectionKind, DigiProtocol};
use crate::error::{ConnectionError, Result};
use crate::status::{InitOutcome, InitReport, SocketState};

const READ_CHUNK_SIZE: usize = 8 * 1024;
const MAX_READS_PER_POLL: usize = 64;

/// A data socket and a command socket to one instrument.
///
/// The data socket carries the instrument's byte stream; the command socket
/// carries text commands (for an RSN DIGI: banner, timestamping, breaks).
/// Each socket moves independently through
/// `Unconfigured -> Configured -> Connected`.
///
/// All operations take `&mut self`; a connection is driven from one place
/// at a time.
#[derive(Debug)]
pub struct InstrumentConnection<S> {
    kind: ConnectionKind,
    policy: ConnectedPolicy,
    protocol: DigiProtocol,
    command_config: CommandConfig,
    data: S,
    command: S,
    timestamp_binary_on: bool,
    /// Response bytes read while waiting for an echo that never came.
    early_response: Vec<u8>,
}

impl<S: CommSocket + Default> InstrumentConnection<S> {
    /// Create an unconfigured connection with default sockets.
    pub fn new(kind: ConnectionKind) -> Self {
        Self::with_sockets(kind, S::default(), S::default())
    }
}

impl<S: CommSocket> InstrumentConnection<S> {
    /// Create a connection over caller-supplied sockets.
    pub fn with_sockets(kind: ConnectionKind, data: S, command: S) -> Self {
        Self {
            kind,
            policy: kind.default_policy(),
            protocol: DigiProtocol::default(),
            command_config: CommandConfig::default(),
            data,
            command,
            timestamp_binary_on: false,
            early_response: Vec::new(),
        }
    }

    /// Override what `connected()` requires.
    pub fn with_connected_policy(mut self, policy: ConnectedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_protocol(mut self, protocol: DigiProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_command_config(mut self, config: CommandConfig) -> Self {
        self.command_config = config;
        self
    }

    pub fn connection_kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn connected_policy(&self) -> ConnectedPolicy {
        self.policy
    }

    pub fn protocol(&self) -> &DigiProtocol {
        &self.protocol
    }

    pub fn command_config(&self) -> &CommandConfig {
        &self.command_config
    }

    // --- configuration -----------------------------------------------------

    /// Set the data host. Reconnects once if the socket is up and the host changed.
    pub fn set_data_host(&mut self, host: &str) -> Result<()> {
        let changed = self.data.hostname() != host;
        self.data.set_hostname(host);
        self.reconnect_data_if(changed)
    }

    /// Set the data port. Reconnects once if the socket is up and the port changed.
    pub fn set_data_port(&mut self, port: u16) -> Result<()> {
        let changed = self.data.port() != port;
        self.data.set_port(port);
        self.reconnect_data_if(changed)
    }

    /// Set the command host. Reconnects once if the socket is up and the host changed.
    pub fn set_command_host(&mut self, host: &str) -> Result<()> {
        let changed = self.command.hostname() != host;
        self.command.set_hostname(host);
        self.reconnect_command_if(changed)
    }

    /// Set the command port. Reconnects once if the socket is up and the port changed.
    pub fn set_command_port(&mut self, port: u16) -> Result<()> {
        let changed = self.command.port() != port;
        self.command.set_port(port);
        self.reconnect_command_if(changed)
    }

    fn reconnect_data_if(&mut self, changed: bool) -> Result<()> {
        if !changed || !self.data.connected() {
            return Ok(());
        }

        info!(endpoint = %self.data.endpoint(), "data endpoint changed, reconnecting");
        self.data.initialize().map_err(|err| {
            error!(endpoint = %self.data.endpoint(), error = %err, "data socket reconnect failed");
            ConnectionError::from(err)
        })
    }

    fn reconnect_command_if(&mut self, changed: bool) -> Result<()> {
        if !changed || !self.command.connected() {
            return Ok(());
        }

        info!(endpoint = %self.command.endpoint(), "command endpoint changed, reconnecting");
        match self.initialize_command_socket() {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(endpoint = %self.command.endpoint(), "command socket handshake failed after reconnect");
                Ok(())
            }
            Err(err) => {
                error!(endpoint = %self.command.endpoint(), error = %err, "command socket reconnect failed");
                Err(err)
            }
        }
    }

    pub fn data_host(&self) -> &str {
        self.data.hostname()
    }

    pub fn data_port(&self) -> u16 {
        self.data.port()
    }

    pub fn command_host(&self) -> &str {
        self.command.hostname()
    }

    pub fn command_port(&self) -> u16 {
        self.command.port()
    }

    pub fn data_configured(&self) -> bool {
        self.data.is_configured()
    }

    pub fn command_configured(&self) -> bool {
        self.command.is_configured()
    }

    /// Enough configuration to initialize the data socket.
    pub fn data_initialized(&self) -> bool {
        self.data_configured()
    }

    /// Enough configuration to initialize the command socket.
    pub fn command_initialized(&self) -> bool {
        self.command_configured()
    }

    pub fn data_connected(&self) -> bool {
        self.data.connected()
    }

    pub fn command_connected(&self) -> bool {
        self.command.connected()
    }

    pub fn data_state(&self) -> SocketState {
        socket_state(&self.data)
    }

    pub fn command_state(&self) -> SocketState {
        socket_state(&self.command)
    }

    /// Connected according to the connection's [`ConnectedPolicy`].
    pub fn connected(&self) -> bool {
        match self.policy {
            ConnectedPolicy::DataOnly => self.data.connected(),
            ConnectedPolicy::DataAndCommand => self.data.connected() && self.command.connected(),
        }
    }

    /// True once the DIGI acknowledged binary timestamping.
    pub fn is_timestamp_binary_on(&self) -> bool {
        self.timestamp_binary_on
    }

    pub fn data_socket_mut(&mut self) -> &mut S {
        &mut self.data
    }

    pub fn command_socket_mut(&mut self) -> &mut S {
        &mut self.command
    }

    // --- lifecycle ---------------------------------------------------------

    /// Bring up every configured socket that is not already connected.
    ///
    /// Sockets are handled independently and nothing is rolled back; the
    /// report says what happened to each one.
    pub fn initialize(&mut self) -> InitReport {
        let data = if !self.data.is_configured() {
            warn!("data port not configured, not initializing");
            InitOutcome::Skipped
        } else if self.data.connected() {
            InitOutcome::AlreadyConnected
        } else {
            debug!(endpoint = %self.data.endpoint(), "initialize data socket");
            match self.data.initialize() {
                Ok(()) => InitOutcome::Connected,
                Err(err) => {
                    error!(endpoint = %self.data.endpoint(), error = %err, "data socket initialization failed");
                    InitOutcome::Failed(err.into())
                }
            }
        };

        let command = if !self.command.is_configured() {
            warn!("command port not configured, not initializing");
            InitOutcome::Skipped
        } else if self.command.connected() {
            InitOutcome::AlreadyConnected
        } else {
            debug!(endpoint = %self.command.endpoint(), "initialize command socket");
            match self.initialize_command_socket() {
                Ok(true) => InitOutcome::Connected,
                Ok(false) => InitOutcome::ProtocolFailed,
                Err(err) => {
                    error!(endpoint = %self.command.endpoint(), error = %err, "command socket initialization failed");
                    InitOutcome::Failed(err)
                }
            }
        };

        InitReport { data, command }
    }

    /// Connect the command socket and, for an RSN DIGI, run the handshake:
    /// wait for the banner, then switch on binary timestamping.
    ///
    /// Any failure leaves the command socket disconnected and timestamping
    /// off. Returns `Ok(false)` for protocol failures.
    pub fn initialize_command_socket(&mut self) -> Result<bool> {
        self.timestamp_binary_on = false;
        self.early_response.clear();

        let result = self.command_handshake();
        if !matches!(result, Ok(true)) {
            debug!(endpoint = %self.command.endpoint(), "closing command socket after failed initialization");
            self.command.disconnect();
        }
        result
    }

    fn command_handshake(&mut self) -> Result<bool> {
        self.command.initialize()?;
        info!(endpoint = %self.command.endpoint(), kind = %self.kind, "command socket connected");

        match self.kind {
            ConnectionKind::Tcp => Ok(true),
            ConnectionKind::Rsn => {
                if !self.await_banner()? {
                    return Ok(false);
                }
                self.set_timestamp_binary_on()
            }
        }
    }

    fn await_banner(&mut self) -> Result<bool> {
        let banner = self.protocol.banner.clone();
        let ok = self.read_command_response(banner.as_bytes())?;
        if ok {
            debug!("DIGI banner received");
        } else {
            error!(endpoint = %self.command.endpoint(), "DIGI banner not received");
        }
        Ok(ok)
    }

    /// Ask the DIGI for binary timestamps and wait for its acknowledgement.
    pub fn set_timestamp_binary_on(&mut self) -> Result<bool> {
        self.timestamp_binary_on = false;

        let command = self.protocol.timestamping_command.clone();
        let ack = self.protocol.timestamping_ack.clone();

        if !self.send_command_expecting(&command, ack.as_bytes())? {
            error!("failed to send timestamping command");
            return Ok(false);
        }

        let ok = self.read_command_response(ack.as_bytes())?;
        if ok {
            info!("binary timestamping enabled");
        } else {
            error!("binary timestamping not acknowledged");
        }
        self.timestamp_binary_on = ok;
        Ok(ok)
    }

    /// Send one command line and, if the remote echoes, wait for the echo.
    ///
    /// A missing echo is reported as `Ok(false)` and not retried.
    pub fn send_command(&mut self, command: &str) -> Result<bool> {
        self.send_command_expecting(command, &[])
    }

    /// Send one command line whose answer starts with `response`.
    ///
    /// A remote that skips the echo and answers straight away is accepted;
    /// the answer bytes already read are kept for the next
    /// [`read_command_response`](Self::read_command_response).
    fn send_command_expecting(&mut self, command: &str, response: &[u8]) -> Result<bool> {
        let line = format!("{command}{}", self.protocol.line_ending);
        if self.protocol.command_echo && line.len() > self.command_config.buffer_capacity {
            return Err(ConnectionError::CommandTooLong {
                len: line.len(),
                max: self.command_config.buffer_capacity,
            });
        }

        self.early_response.clear();
        info!(command, length = line.len(), "sending command");
        if let Err(err) = self.command.write_data(line.as_bytes()) {
            error!(command, error = %err, "failed to send command");
            return Err(err.into());
        }

        if !self.protocol.command_echo {
            return Ok(true);
        }

        match await_echo(&mut self.command, line.as_bytes(), response, &self.command_config)? {
            EchoOutcome::Echoed => Ok(true),
            EchoOutcome::Skipped(head) => {
                debug!(command, "remote answered without echo");
                self.early_response = head;
                Ok(true)
            }
            EchoOutcome::Missing => {
                warn!(command, "command echo not received");
                Ok(false)
            }
        }
    }

    /// Poll the command socket until `expected` arrives, a mismatch is
    /// seen, or the tick budget runs out.
    pub fn read_command_response(&mut self, expected: &[u8]) -> Result<bool> {
        let already = std::mem::take(&mut self.early_response);
        await_response_from(&mut self.command, expected, &already, &self.command_config)
    }

    /// Send a serial break of `duration_ms` through the DIGI.
    ///
    /// Opens a command session first if none is open. The command socket is
    /// always closed afterwards, whatever the outcome.
    pub fn send_break(&mut self, duration_ms: u32) -> Result<bool> {
        if self.kind != ConnectionKind::Rsn {
            warn!(kind = %self.kind, "serial break requires an RSN DIGI");
            return Ok(false);
        }

        let result = self.break_exchange(duration_ms);
        self.early_response.clear();
        debug!(endpoint = %self.command.endpoint(), "closing command session after break");
        self.command.disconnect();
        result
    }

    fn break_exchange(&mut self, duration_ms: u32) -> Result<bool> {
        if !self.command.connected() {
            self.command.initialize()?;
            if !self.await_banner()? {
                return Ok(false);
            }
        }

        let command = self.protocol.break_command(duration_ms);
        let ack = self.protocol.break_ack(duration_ms);

        if !self.send_command_expecting(&command, ack.as_bytes())? {
            error!(duration_ms, "failed to send break");
            return Ok(false);
        }

        let ok = self.read_command_response(ack.as_bytes())?;
        if ok {
            info!(duration_ms, "serial break sent");
        } else {
            error!(duration_ms, "serial break not acknowledged");
        }
        Ok(ok)
    }

    /// Tear down both sockets.
    pub fn disconnect(&mut self) -> bool {
        self.timestamp_binary_on = false;
        self.early_response.clear();
        let data = self.data.disconnect();
        let command = self.command.disconnect();
        data && command
    }

    // --- data path ---------------------------------------------------------

    /// Drain the data socket and return every complete packet.
    ///
    /// `buf` holds partial RSN packets between calls. For a TCP instrument
    /// the raw bytes are wrapped into `DATA_FROM_INSTRUMENT` packets stamped
    /// with the current time. If the socket fails after some data was read,
    /// the packets are returned and the next call reports the error.
    pub fn poll_data(&mut self, buf: &mut BytesMut) -> Result<Vec<Packet>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut failure: Option<TransportError> = None;

        for _ in 0..MAX_READS_PER_POLL {
            match self.data.read_data(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let packets = self.frame(buf)?;

        match failure {
            Some(err) if packets.is_empty() => Err(err.into()),
            Some(err) => {
                warn!(error = %err, count = packets.len(), "data socket failed, delivering buffered packets");
                Ok(packets)
            }
            None => Ok(packets),
        }
    }

    fn frame(&self, buf: &mut BytesMut) -> Result<Vec<Packet>> {
        let mut packets = Vec::new();
        match self.kind {
            ConnectionKind::Rsn => {
                while let Some(packet) = decode_packet(buf, PacketKind::Rsn)? {
                    packets.push(packet);
                }
            }
            ConnectionKind::Tcp => {
                let raw = buf.split();
                let now = Timestamp::now();
                for payload in raw.chunks(MAX_PAYLOAD_SIZE) {
                    packets.push(Packet::new(PacketType::DataFromInstrument, now, payload)?);
                }
            }
        }
        Ok(packets)
    }
}

fn socket_state<S: CommSocket>(socket: &S) -> SocketState {
    if socket.connected() {
        SocketState::Connected
    } else if socket.is_configured() {
        SocketState::Configured
    } else {
        SocketState::Unconfigured
    }
}


#[cfg(all(test, unix))]
mod loopback_tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::{Duration, Instant};

    use portagent_packet::PacketReader;
    use portagent_transport::{SocketIo, TcpCommSocket};

    use super::*;

    const BANNER: &[u8] = b"OOI - Digi Command Interface\r\ntype help for command information\r\n";

    fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("loopback listener should bind");
        let port = listener.local_addr().expect("listener has address").port();
        (listener, port)
    }

    /// Answer one command line the way a DIGI does: echo, then `reply`.
    fn answer(stream: &mut TcpStream, expected: &[u8], reply: &[u8]) {
        let mut line = vec![0u8; expected.len()];
        stream.read_exact(&mut line).expect("command line should arrive");
        assert_eq!(line, expected);
        stream.write_all(&line).expect("echo should send");
        stream.write_all(reply).expect("reply should send");
    }

    fn connection(data_port: u16, command_port: u16) -> InstrumentConnection<TcpCommSocket> {
        let mut conn = InstrumentConnection::new(ConnectionKind::Rsn).with_command_config(
            CommandConfig {
                tick: Duration::from_millis(20),
                ..CommandConfig::default()
            },
        );
        conn.set_data_host("127.0.0.1").expect("not connected, no reconnect");
        conn.set_data_port(data_port).expect("not connected, no reconnect");
        conn.set_command_host("127.0.0.1").expect("not connected, no reconnect");
        conn.set_command_port(command_port).expect("not connected, no reconnect");
        conn
    }

    #[test]
    fn digi_session_over_tcp() {
        let (data_listener, data_port) = listener();
        let (command_listener, command_port) = listener();

        let sample = Packet::build(
            PacketKind::Rsn,
            PacketType::DataFromRsn,
            Timestamp::from_secs_f64(3_900_000_000.25),
            b"#12.34,56.78\r\n",
        )
        .expect("packet should build");
        let wire = sample.buffer().to_vec();

        let digi = thread::spawn(move || {
            let (mut command, _) = command_listener.accept().expect("command accept");
            command.write_all(BANNER).expect("banner should send");
            answer(
                &mut command,
                b"timestamping 2\r\n",
                b"Set Timestamping:On(binary)\r\n\r\n",
            );

            let (mut data, _) = data_listener.accept().expect("data accept");
            data.write_all(b"junk").expect("junk should send");
            data.write_all(&wire).expect("packet should send");

            // Break session on a fresh command connection.
            let (mut command, _) = command_listener.accept().expect("break accept");
            command.write_all(BANNER).expect("banner should send");
            answer(
                &mut command,
                b"break 300\r\n",
                b"Sending Serial Break 300(ms)\r\n\r\n",
            );
            let mut rest = Vec::new();
            let _ = command.read_to_end(&mut rest);
            rest
        });

        let mut conn = connection(data_port, command_port);
        let report = conn.initialize();
        assert!(report.all_up(), "report: {report:?}");
        assert!(conn.is_timestamp_binary_on());

        let mut buf = BytesMut::new();
        let deadline = Instant::now() + Duration::from_secs(3);
        let mut packets = Vec::new();
        while packets.is_empty() && Instant::now() < deadline {
            packets = conn.poll_data(&mut buf).expect("poll should succeed");
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(packets, vec![sample]);

        // Close the handshake session so the break opens its own.
        conn.command_socket_mut().disconnect();
        assert!(conn.send_break(300).expect("break exchange"));
        assert!(!conn.command_connected());

        let trailing = digi.join().expect("digi thread should finish");
        assert!(trailing.is_empty());
    }

    #[test]
    fn packet_reader_over_data_socket() {
        let (data_listener, data_port) = listener();
        let first = Packet::build(
            PacketKind::Rsn,
            PacketType::DataFromRsn,
            Timestamp::from_secs_f64(1.5),
            b"one",
        )
        .expect("packet should build");
        let wire = first.buffer().to_vec();

        let server = thread::spawn(move || {
            let (mut data, _) = data_listener.accept().expect("data accept");
            data.write_all(&wire).expect("packet should send");
        });

        let mut socket = TcpCommSocket::with_endpoint("127.0.0.1", data_port);
        socket.initialize().expect("socket should connect");

        let mut reader = PacketReader::with_kind(SocketIo::new(&mut socket), PacketKind::Rsn);
        let deadline = Instant::now() + Duration::from_secs(3);
        let packet = loop {
            match reader.read_packet() {
                Ok(packet) => break packet,
                Err(portagent_packet::PacketError::Io(err))
                    if err.kind() == std::io::ErrorKind::WouldBlock
                        && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(err) => panic!("unexpected read error: {err}"),
            }
        };
        assert_eq!(packet, first);
        server.join().expect("server thread should finish");
    }

    #[test]
    fn unreachable_command_port_leaves_data_up() {
        let (data_listener, data_port) = listener();
        let (closed, command_port) = listener();
        drop(closed);

        let mut conn = connection(data_port, command_port);
        let report = conn.initialize();
        let _accepted = data_listener.accept().expect("data accept");

        assert!(matches!(report.data, InitOutcome::Connected));
        assert!(matches!(
            report.command,
            InitOutcome::Failed(ConnectionError::Transport(TransportError::Connect { .. }))
        ));
        assert!(conn.connected());
        assert!(!conn.is_timestamp_binary_on());
    }
}
