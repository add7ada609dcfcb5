//! Terminal client for a singular relay.
//!
//! Joins a room, prints the table after every change and reads commands
//! from stdin.

use anyhow::{Context, Result};
use pico_args::Arguments;
use singular::{SessionConfig, SessionError, session::driver::DriverError};
use singular_client::{
    commands::{HELP as COMMAND_HELP, parse_command},
    run_client,
    terminal::TerminalStage,
    websocket_client::room_url,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

const HELP: &str = "\
Play singular in the terminal

USAGE:
  singular_client [OPTIONS]

OPTIONS:
  --server URL          Relay address  [default: env SINGULAR_SERVER or ws://127.0.0.1:6969]
  --code CODE           Room code  [default: lobby]
  --name NAME           Player name  [default: your user name]

FLAGS:
  -h, --help            Print help information
";

struct Args {
    server: String,
    code: String,
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        server: pargs.opt_value_from_str("--server")?.unwrap_or_else(|| {
            std::env::var("SINGULAR_SERVER").unwrap_or_else(|_| "ws://127.0.0.1:6969".to_string())
        }),
        code: pargs
            .opt_value_from_str("--code")?
            .unwrap_or_else(|| "lobby".to_string()),
        name: pargs
            .opt_value_from_str("--name")?
            .unwrap_or_else(whoami::username),
    };

    env_logger::builder().format_target(false).init();
    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let config = SessionConfig::from_env().context("Invalid session configuration")?;
    let url = room_url(&args.server, &args.code);
    println!("Joining room '{}' at {} as {}...", args.code, url, args.name);
    println!("Type 'help' for commands.\n");

    let (commands, command_rx) = mpsc::unbounded_channel();
    let input = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match line.trim() {
                "" => continue,
                "quit" | "exit" => break,
                "help" | "?" => println!("{COMMAND_HELP}"),
                input => match parse_command(input) {
                    Ok(command) => {
                        if commands.send(command).is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("Error: {e}"),
                },
            }
        }
    });

    let stage = Box::new(TerminalStage::stdout());
    let result = run_client(&url, &args.name, stage, config, command_rx).await;
    input.abort();

    match result {
        Ok(_) => println!("\nDisconnected."),
        Err(DriverError::Rejected(SessionError::GameInProgress)) => {
            println!("\nThat room is in the middle of a game. Try again later.");
        }
        Err(e) => return Err(e).context("Session ended"),
    }
    Ok(())
}
