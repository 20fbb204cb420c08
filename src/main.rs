//! `sleuth` - a research assistant for the terminal
//!
//! Questions go to a Claude-driven ReAct loop that searches the web and
//! reads pages before answering. Follow-ups reuse the session history.

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;
use sleuth_core::agent::{logger, Agent, AgentEvent};
use sleuth_core::config::{self, Config};
use sleuth_core::output::{EventPrinter, OutputFormatter};
use sleuth_core::SleuthError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::cli::{Cli, Commands};

mod cli;

const QUIT_WORDS: &[&str] = &["quit", "exit", "q"];
const RESET_WORDS: &[&str] = &["new", "reset", "clear"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!(
            "{} v{} ({})",
            Style::new().blue().apply_to("sleuth"),
            env!("CARGO_PKG_VERSION"),
            env!("GIT_HASH")
        );
        return Ok(());
    }

    let formatter = OutputFormatter::new();

    config::load_dotenv();
    let source = cli.config.clone().or_else(config::find_config_file);
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);

    logger::init(config::get_data_dir());
    logger::set_verbose(config.verbose);
    sleuth_core::info_log!("sleuth {} starting, config from {:?}", env!("CARGO_PKG_VERSION"), source);

    match &cli.command {
        Some(Commands::Config) => {
            let yaml = config.to_redacted_yaml()?;
            formatter.print_config(&yaml, source.as_deref());
        }

        Some(Commands::Ask { question }) => {
            let (mut agent, mut events) = start(&config, &formatter)?;
            let question = question.join(" ");
            let mut printer = EventPrinter::new();

            match ask(&mut agent, &mut events, &mut printer, &question).await {
                Ok(answer) => formatter.print_answer(&answer),
                Err(e) => {
                    formatter.print_error(&e.user_message());
                    std::process::exit(1);
                }
            }
        }

        None => {
            let (agent, events) = start(&config, &formatter)?;
            formatter.print_banner();

            tokio::select! {
                res = repl(agent, events, &formatter) => res?,
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    println!();
                    formatter.print_goodbye();
                }
            }
        }
    }

    Ok(())
}

/// Pre-flight key check, then build the agent wired to an event channel
fn start(config: &Config, formatter: &OutputFormatter) -> Result<(Agent, UnboundedReceiver<AgentEvent>)> {
    let missing = config.missing_keys();
    if !missing.is_empty() {
        formatter.print_missing_keys(&missing);
        std::process::exit(1);
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let agent = sleuth_core::build_agent(config)?.with_event_sender(tx);
    Ok((agent, rx))
}

/// Run one question, printing progress events as they arrive
async fn ask(
    agent: &mut Agent,
    events: &mut UnboundedReceiver<AgentEvent>,
    printer: &mut EventPrinter,
    question: &str,
) -> std::result::Result<String, SleuthError> {
    let run = agent.run(question);
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            res = &mut run => break res,
            Some(event) = events.recv() => printer.print(&event),
        }
    };

    while let Ok(event) = events.try_recv() {
        printer.print(&event);
    }
    result
}

async fn repl(
    mut agent: Agent,
    mut events: UnboundedReceiver<AgentEvent>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut printer = EventPrinter::new();
    let prompt = Style::new().bold().apply_to("❓ Question: ").to_string();

    loop {
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            println!();
            println!();
            formatter.print_goodbye();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let lowered = input.to_lowercase();
        if QUIT_WORDS.contains(&lowered.as_str()) {
            formatter.print_goodbye();
            break;
        }

        if RESET_WORDS.contains(&lowered.as_str()) {
            agent.new_session();
            while let Ok(event) = events.try_recv() {
                printer.print(&event);
            }
            formatter.print_info("✅  New conversation started.\n");
            continue;
        }

        match ask(&mut agent, &mut events, &mut printer, input).await {
            Ok(answer) => formatter.print_answer(&answer),
            Err(e) => formatter.print_error(&e.user_message()),
        }
    }

    Ok(())
}
