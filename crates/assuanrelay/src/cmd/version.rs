use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("assuanrelay {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: assuanrelay");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("ASSUANRELAY_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("ASSUANRELAY_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "direct_socket: {}",
        if cfg!(unix) { "unix-domain-socket" } else { "unsupported" }
    );
    println!("indirect_file: tcp-loopback");

    Ok(SUCCESS)
}
