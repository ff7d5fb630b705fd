//! LogKV CLI Client
//!
//! Runs one command, or an interactive prompt when none is given.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use logkv::network::Client;
use logkv::KvError;

const HELP: &str = "\
Commands:
  get <key>            print the value stored under key
  set <key> <value>    store value under key, overwriting it
  delete <key>         remove key
  view                 print every key and value
  size                 print the number of keys
  help                 show this message
  exit                 leave the prompt";

/// LogKV CLI
#[derive(Parser, Debug)]
#[command(name = "logkv-cli")]
#[command(about = "CLI for the LogKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9686")]
    server: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Print every key-value pair
    View,

    /// Print the number of keys
    Size,

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    match args.command {
        Some(command) => {
            if let Err(e) = run(&args.server, command) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
        None => repl(&args.server),
    }
}

fn run(server: &str, command: Commands) -> logkv::Result<()> {
    let mut client = Client::connect(server)?;

    match command {
        Commands::Get { key } => println!("{}", client.get(&key)?),
        Commands::Set { key, value } => {
            client.put(&key, &value)?;
            println!("OK");
        }
        Commands::Del { key } => {
            client.delete(&key)?;
            println!("OK");
        }
        Commands::View => {
            let entries = client.enumerate()?;
            if entries.is_empty() {
                println!("(empty)");
            }
            for (key, value) in entries {
                println!("{} = {}", key, value);
            }
        }
        Commands::Size => println!("{}", client.size()?),
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    Ok(())
}

fn repl(server: &str) {
    println!("LogKV CLI v{} connected to {}", logkv::VERSION, server);
    println!("{}", HELP);

    let stdin = io::stdin();
    prompt();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };

        match parse_line(&line) {
            Ok(Some(command)) => match run(server, command) {
                Ok(()) => {}
                Err(KvError::KeyNotFound(key)) => println!("key {:?} does not exist", key),
                Err(e) => println!("error: {}", e),
            },
            Ok(None) => {}
            Err(Action::Help) => println!("{}", HELP),
            Err(Action::Exit) => return,
            Err(Action::Invalid) => println!("invalid input: {}", line.trim()),
        }

        prompt();
    }
}

enum Action {
    Help,
    Exit,
    Invalid,
}

/// Parse one prompt line; a leading `store` word is accepted and ignored
fn parse_line(line: &str) -> Result<Option<Commands>, Action> {
    let mut words = line.split_whitespace().peekable();
    if words.peek() == Some(&"store") {
        words.next();
    }

    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb, args.as_slice()) {
        ("get", [key]) => Commands::Get { key: key.to_string() },
        ("set", [key, value @ ..]) if !value.is_empty() => Commands::Set {
            key: key.to_string(),
            value: value.join(" "),
        },
        ("delete" | "del", [key]) => Commands::Del { key: key.to_string() },
        ("view", []) => Commands::View,
        ("size", []) => Commands::Size,
        ("ping", []) => Commands::Ping,
        ("help", _) => return Err(Action::Help),
        ("exit" | "quit", _) => return Err(Action::Exit),
        _ => return Err(Action::Invalid),
    };

    Ok(Some(command))
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}
