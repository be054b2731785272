use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use portagent_packet::Packet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::traits::Publisher;

/// How a [`FilePublisher`] renders each packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherFormat {
    /// Raw wire buffer.
    #[default]
    Binary,
    /// `<label ...>payload</label>` envelope.
    Ascii,
    /// Multi-line diagnostic dump.
    Pretty,
}

impl fmt::Display for PublisherFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublisherFormat::Binary => "binary",
            PublisherFormat::Ascii => "ascii",
            PublisherFormat::Pretty => "pretty",
        };
        f.write_str(name)
    }
}

/// Appends rendered packets to a file or any other writer.
pub struct FilePublisher<W: Write> {
    out: W,
    format: PublisherFormat,
}

impl FilePublisher<BufWriter<File>> {
    /// Open `path` for appending, creating it if needed.
    pub fn append(path: impl AsRef<Path>, format: PublisherFormat) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), %format, "file publisher opened");
        Ok(Self::new(BufWriter::new(file), format))
    }
}

impl<W: Write> FilePublisher<W> {
    pub fn new(out: W, format: PublisherFormat) -> Self {
        Self { out, format }
    }

    pub fn format(&self) -> PublisherFormat {
        self.format
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Publisher for FilePublisher<W> {
    fn name(&self) -> &str {
        "file"
    }

    fn publish(&mut self, packet: &Packet) -> Result<()> {
        match self.format {
            PublisherFormat::Binary => self.out.write_all(packet.buffer())?,
            PublisherFormat::Ascii => self.out.write_all(&packet.as_ascii_bytes())?,
            PublisherFormat::Pretty => self.out.write_all(packet.pretty().as_bytes())?,
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use portagent_packet::{PacketType, Timestamp};

    use super::*;

    fn abc() -> Packet {
        Packet::new(
            PacketType::DataFromInstrument,
            Timestamp::from_secs_f64(1.0),
            b"abc",
        )
        .unwrap()
    }

    #[test]
    fn renders_each_format() {
        let packet = abc();

        let mut binary = FilePublisher::new(Vec::new(), PublisherFormat::Binary);
        assert!(binary.handle(&packet));
        assert_eq!(binary.get_ref().as_slice(), packet.buffer());

        let mut ascii = FilePublisher::new(Vec::new(), PublisherFormat::Ascii);
        assert!(ascii.handle(&packet));
        assert_eq!(ascii.into_inner(), packet.as_ascii().into_bytes());

        let mut pretty = FilePublisher::new(Vec::new(), PublisherFormat::Pretty);
        assert!(pretty.handle(&packet));
        assert_eq!(
            String::from_utf8(pretty.into_inner()).unwrap(),
            packet.pretty()
        );
    }

    #[test]
    fn append_to_file() {
        let path = std::env::temp_dir().join(format!(
            "portagent-file-publisher-{}-{}.log",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));

        {
            let mut publisher =
                FilePublisher::append(&path, PublisherFormat::Ascii).expect("file should open");
            assert!(publisher.handle(&abc()));
        }
        {
            let mut publisher =
                FilePublisher::append(&path, PublisherFormat::Ascii).expect("file should reopen");
            assert!(publisher.handle(&abc()));
        }

        let contents = std::fs::read_to_string(&path).expect("file should be readable");
        assert_eq!(contents.matches("</port_agent_packet>\n\r").count(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn format_names() {
        let format: PublisherFormat = serde_json::from_str("\"pretty\"").unwrap();
        assert_eq!(format, PublisherFormat::Pretty);
        assert_eq!(PublisherFormat::default().to_string(), "binary");
    }
}
