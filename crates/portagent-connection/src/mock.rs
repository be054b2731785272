//! Scripted in-memory socket for connection tests.

use std::collections::VecDeque;

use portagent_transport::{CommSocket, Result, TransportError};

/// Plays the remote end of a DIGI port.
///
/// Every successful `initialize` queues the banner. Every write is echoed
/// back when echo is on, followed by the reply registered for that line.
#[derive(Debug, Default)]
pub struct MockSocket {
    hostname: String,
    port: u16,
    connected: bool,
    banner: Vec<u8>,
    echo: bool,
    replies: Vec<(Vec<u8>, Vec<u8>)>,
    inbox: VecDeque<u8>,
    pub written: Vec<u8>,
    pub init_calls: u32,
    pub reads: u32,
    pub fail_next: u32,
}

impl MockSocket {
    pub fn configured(hostname: &str, port: u16) -> Self {
        Self {
            hostname: hostname.to_string(),
            port,
            ..Self::default()
        }
    }

    pub fn with_banner(mut self, banner: &str) -> Self {
        self.banner = banner.as_bytes().to_vec();
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn reply_to(mut self, line: &str, reply: &str) -> Self {
        self.replies
            .push((line.as_bytes().to_vec(), reply.as_bytes().to_vec()));
        self
    }

    pub fn failing_init(mut self, times: u32) -> Self {
        self.fail_next = times;
        self
    }

    pub fn push_inbox(&mut self, bytes: &[u8]) {
        self.inbox.extend(bytes.iter().copied());
    }
}

impl CommSocket for MockSocket {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn set_hostname(&mut self, hostname: &str) {
        self.hostname = hostname.to_string();
    }

    fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    fn initialize(&mut self) -> Result<()> {
        if !self.is_configured() {
            return Err(TransportError::MissingConfig);
        }

        self.init_calls += 1;
        self.connected = false;
        self.inbox.clear();

        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(TransportError::Connect {
                host: self.hostname.clone(),
                port: self.port,
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }

        self.connected = true;
        let banner = self.banner.clone();
        self.push_inbox(&banner);
        Ok(())
    }

    fn connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) -> bool {
        self.connected = false;
        self.inbox.clear();
        true
    }

    fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.reads += 1;

        let n = buf.len().min(self.inbox.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_data(&mut self, buf: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.written.extend_from_slice(buf);

        if self.echo {
            self.push_inbox(buf);
        }
        if let Some((_, reply)) = self.replies.iter().find(|(line, _)| line == buf) {
            let reply = reply.clone();
            self.push_inbox(&reply);
        }
        Ok(())
    }
}
