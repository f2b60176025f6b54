use anyhow::Result;
use corechat::api::{logging, AgentClient};
use corechat::cli::{apply_command, parse_command, Command, HELP};
use corechat::config::Config;
use corechat::mcp::McpToolDiscovery;
use corechat::state::ConversationManager;
use corechat::ui::TerminalSink;
use crossterm::style::Stylize;
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing()?;
    let config = Config::load()?;
    config.validate()?;

    let client = AgentClient::new(&config)?;
    let mut manager =
        ConversationManager::new(Arc::new(client)).with_options(config.turn_options());
    if let Some(mcp_url) = &config.mcp_url {
        manager = manager.with_discovery(Arc::new(McpToolDiscovery::new(mcp_url.clone())));
    }
    tracing::info!(url = %config.runtime_url, mcp = ?config.mcp_url, "corechat started");

    let interactive = std::io::stdout().is_terminal();
    let mut sink = TerminalSink::stdout(interactive);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "{}",
        format!(
            "corechat | session {}... | {} | /help for commands",
            manager.short_session_id(),
            config.runtime_url
        )
        .dark_grey()
    );

    loop {
        print!("{}", "you> ".bold().blue());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }

        match parse_command(prompt) {
            Some(Ok(Command::Quit)) => break,
            Some(Ok(Command::Help)) => println!("{HELP}"),
            Some(Ok(command)) => println!("{}", apply_command(&mut manager, command)),
            Some(Err(message)) => println!("{}", message.red()),
            None => {
                let cancel = CancellationToken::new();
                let watcher = tokio::spawn({
                    let cancel = cancel.clone();
                    async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            cancel.cancel();
                        }
                    }
                });
                let outcome = manager.run_turn(prompt, &mut sink, &cancel).await;
                watcher.abort();
                if outcome.cancelled {
                    println!("{}", "(cancelled)".dark_grey());
                }
            }
        }
    }

    println!();
    Ok(())
}
