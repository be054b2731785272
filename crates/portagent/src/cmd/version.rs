use portagent_packet::{HEADER_SIZE, MAX_PAYLOAD_SIZE, SYNC};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    let version = env!("CARGO_PKG_VERSION");
    if !args.extended {
        println!("portagent {version}");
        return Ok(SUCCESS);
    }

    let build_target = option_env!("PORTAGENT_BUILD_TARGET").unwrap_or("unknown");
    let lines = [
        ("name", "portagent".to_string()),
        ("version", version.to_string()),
        ("build_target", build_target.to_string()),
        (
            "platform",
            format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        ),
        (
            "git_hash",
            option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        ),
        (
            "packet",
            format!("sync=0x{SYNC:06X}, header={HEADER_SIZE}, max_payload={MAX_PAYLOAD_SIZE}"),
        ),
        (
            "features",
            format!(
                "connection={}, publisher={}, cli=true",
                cfg!(feature = "connection"),
                cfg!(feature = "publisher")
            ),
        ),
    ];
    for (key, value) in lines {
        println!("{key}: {value}");
    }

    Ok(SUCCESS)
}
