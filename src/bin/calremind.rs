use anyhow::{Context, Result};
use calremind::cli::{self, Command};
use calremind::config::Config;
use calremind::context::{AppContext, StandardContext};
use calremind::scheduler::Scheduler;
use calremind::storage::FileSubscriberStore;
use calremind::store::SubscriberRegistry;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::env;
use std::fs::OpenOptions;
use std::sync::Arc;

fn init_logging(ctx: &dyn AppContext, level: LevelFilter) {
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        log_config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));

    if let Some(path) = ctx.get_log_path()
        && let Ok(file) = OpenOptions::new().create(true).append(true).open(&path)
    {
        loggers.push(WriteLogger::new(level, log_config, file));
    }

    // A logger may already be installed (e.g. when embedded); keep going.
    let _ = CombinedLogger::init(loggers);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let invocation = match cli::parse_args(&args) {
        Ok(inv) => inv,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("Try 'calremind --help'.");
            std::process::exit(2);
        }
    };

    if invocation.command == Command::Help {
        cli::print_help("calremind");
        return Ok(());
    }

    let ctx = StandardContext::new(invocation.root);
    let config = Config::load_or_init(&ctx)?;
    init_logging(&ctx, config.log_level_filter());

    match invocation.command {
        Command::Run => run_daemon(&ctx, &config).await,
        Command::Today(date) => {
            let scheduler = Scheduler::from_config(&ctx, &config)?;
            let day = date.unwrap_or_else(|| scheduler.today());
            let batch = scheduler
                .batch_for(day)
                .await
                .with_context(|| format!("Cannot build reminders for {}", day))?;
            if batch.is_empty() {
                println!("Nothing due on {}.", day.format("%d-%m-%Y"));
            }
            for message in batch {
                println!("{}\n", message);
            }
            Ok(())
        }
        Command::Subscribe(id) => {
            let scheduler = Arc::new(Scheduler::from_config(&ctx, &config)?);
            let pending = scheduler.on_subscribe(&id)?;
            let sent = pending.await??;
            println!("{} subscribed ({} reminders sent for today).", id.trim(), sent);
            Ok(())
        }
        Command::Unsubscribe(id) => {
            let scheduler = Scheduler::from_config(&ctx, &config)?;
            if scheduler.on_unsubscribe(&id)? {
                println!("{} unsubscribed.", id.trim());
            } else {
                println!("{} was not subscribed.", id.trim());
            }
            Ok(())
        }
        Command::List => {
            let store = FileSubscriberStore::open(&ctx)?;
            for id in store.list_active()? {
                println!("{}", id);
            }
            Ok(())
        }
        Command::Help => Ok(()),
    }
}

async fn run_daemon(ctx: &dyn AppContext, config: &Config) -> Result<()> {
    let scheduler = Arc::new(Scheduler::from_config(ctx, config)?);
    let handle = scheduler.spawn();
    log::info!(
        "calremind v{} running; press Ctrl-C to stop",
        env!("CARGO_PKG_VERSION")
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    log::info!("Shutting down");
    handle.abort();
    Ok(())
}
