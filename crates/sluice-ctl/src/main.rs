//! sluice-ctl — command-line interface for the Sluice daemon.

use anyhow::{Context, Result};

use sluice_core::config::DEFAULT_API_PORT;

mod cmd;

fn print_usage() {
    println!("Usage: sluice-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status               Show daemon status and transfer totals");
    println!("  transfers            List transfers in flight");
    println!("  files                List stored files");
    println!("  get <name> [out]     Download a stored file");
    println!("  put <path> [name]    Upload a local file");
    println!("  shutdown             Stop the daemon");
    println!();
    println!("Options:");
    println!(
        "  --port <port>   API port (default: {})",
        DEFAULT_API_PORT
    );
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_API_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(port).await,
        ["transfers"] => cmd::status::cmd_transfers(port).await,
        ["shutdown"] => cmd::status::cmd_shutdown(port).await,
        ["files"] => cmd::files::cmd_files(port).await,
        ["get", name] => cmd::files::cmd_get(port, name, None).await,
        ["get", name, out] => cmd::files::cmd_get(port, name, Some(*out)).await,
        ["put", path] => cmd::files::cmd_put(port, path, None).await,
        ["put", path, name] => cmd::files::cmd_put(port, path, Some(*name)).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
