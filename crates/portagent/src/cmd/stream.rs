use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use portagent_connection::InitOutcome;
use portagent_publisher::{DriverPublisher, FilePublisher, LogPublisher, PublisherList};
use tracing::{info, warn};

use crate::cmd::StreamArgs;
use crate::exit::{
    connection_error, io_error, publisher_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE,
};
use crate::output::{ConsolePublisher, OutputFormat};

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.connect.resolve()?;
    let mut conn = config.connection()?;

    if !conn.data_configured() {
        return Err(CliError::new(
            USAGE,
            "data host and port are required (--data-host, --data-port or --config)",
        ));
    }

    let mut publishers = build_publishers(&args, format)?;

    let report = conn.initialize();
    match report.data {
        InitOutcome::Failed(err) => return Err(connection_error("data connect failed", err)),
        InitOutcome::Skipped | InitOutcome::ProtocolFailed => {
            return Err(CliError::new(USAGE, "data socket not initialized"));
        }
        InitOutcome::Connected | InitOutcome::AlreadyConnected => {}
    }
    match &report.command {
        InitOutcome::Failed(err) => warn!(error = %err, "command socket unavailable"),
        InitOutcome::ProtocolFailed => warn!("DIGI handshake failed, timestamps are not binary"),
        _ => {}
    }
    info!(
        kind = %conn.connection_kind(),
        data = %format_args!("{}:{}", conn.data_host(), conn.data_port()),
        timestamping = conn.is_timestamp_binary_on(),
        "streaming"
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let idle = Duration::from_millis(args.poll_ms.max(1));
    let mut buf = BytesMut::new();
    let mut handled = 0usize;

    while running.load(Ordering::SeqCst) {
        let packets = conn
            .poll_data(&mut buf)
            .map_err(|err| connection_error("receive failed", err))?;

        if packets.is_empty() {
            std::thread::sleep(idle);
            continue;
        }

        for packet in &packets {
            publishers.handle(packet);
            handled = handled.saturating_add(1);

            if args.count.is_some_and(|count| handled >= count) {
                conn.disconnect();
                return Ok(SUCCESS);
            }
        }
    }

    conn.disconnect();
    Ok(SUCCESS)
}

fn build_publishers(args: &StreamArgs, format: OutputFormat) -> CliResult<PublisherList> {
    let mut publishers = PublisherList::new();
    publishers.add(ConsolePublisher::new(format));

    if let Some(path) = &args.output {
        let file = FilePublisher::append(path, args.output_format.into())
            .map_err(|err| publisher_error("open output failed", err))?;
        publishers.add(file);
    }

    if let Some(addr) = &args.forward {
        let stream = TcpStream::connect(addr.as_str())
            .map_err(|err| io_error(&format!("connect to driver {addr}"), err))?;
        publishers.add(DriverPublisher::new(stream));
    }

    if args.log_packets {
        publishers.add(LogPublisher::new());
    }

    Ok(publishers)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
