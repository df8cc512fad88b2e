// File: ./src/cli.rs
//! Command-line parsing and help text for the `calremind` binary.
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the daily scheduler (default).
    Run,
    /// Print the batch for a date without sending it.
    Today(Option<NaiveDate>),
    Subscribe(String),
    Unsubscribe(String),
    List,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub root: Option<PathBuf>,
    pub command: Command,
}

/// Parses arguments without the binary name.
pub fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut root = None;
    let mut rest: Vec<&str> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-r" | "--root" => {
                let path = iter.next().ok_or("--root needs a path")?;
                root = Some(PathBuf::from(path));
            }
            "-h" | "--help" | "help" => {
                return Ok(Invocation {
                    root,
                    command: Command::Help,
                });
            }
            other => rest.push(other),
        }
    }

    let command = match rest.as_slice() {
        [] | ["run"] => Command::Run,
        ["today"] => Command::Today(None),
        ["today", "--date", date] => {
            let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;
            Command::Today(Some(day))
        }
        ["subscribe", id] => Command::Subscribe(id.to_string()),
        ["unsubscribe", id] => Command::Unsubscribe(id.to_string()),
        ["list"] => Command::List,
        other => return Err(format!("Unknown command: {}", other.join(" "))),
    };

    Ok(Invocation { root, command })
}

pub fn print_help(binary_name: &str) {
    println!(
        "Calremind v{} - daily reminders for the events in an .ics calendar",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [--root <path>] [command]", binary_name);
    println!();
    println!("COMMANDS:");
    println!("    run                        Start the daily scheduler (default)");
    println!("    today [--date YYYY-MM-DD]  Print the reminders due on a day, send nothing");
    println!("    subscribe <id>             Add a subscriber and send today's reminders");
    println!("    unsubscribe <id>           Remove a subscriber");
    println!("    list                       Show active subscribers");
    println!();
    println!("OPTIONS:");
    println!("    -r, --root <path>     Use a different directory for config and data.");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("The calendar file, bot token and schedule are set in config.toml;");
    println!("a default one is written on first start.");
}
