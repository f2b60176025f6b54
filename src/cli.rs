//! Slash commands understood by the interactive client.

use crate::state::{ConversationManager, Role};
use crate::util::parse_bool_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Tools,
    Debug,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NewSession,
    ShowSession,
    Set(Toggle, bool),
    History,
    Help,
    Quit,
}

pub const HELP: &str = "\
/new              start a new session
/session          show the session id and display settings
/tools on|off     show tool usage
/debug on|off     show debug entries after each reply
/raw on|off       show raw stream lines after each reply
/history          print the conversation so far
/quit             exit";

/// Parses a slash command. Returns `None` for ordinary prompts.
pub fn parse_command(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    let rest = line.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    let command = match name {
        "new" => Ok(Command::NewSession),
        "session" => Ok(Command::ShowSession),
        "history" => Ok(Command::History),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "tools" => parse_toggle(Toggle::Tools, arg),
        "debug" => parse_toggle(Toggle::Debug, arg),
        "raw" => parse_toggle(Toggle::Raw, arg),
        other => Err(format!("unknown command '/{other}', try /help")),
    };
    Some(command)
}

fn parse_toggle(toggle: Toggle, arg: Option<&str>) -> Result<Command, String> {
    arg.and_then(parse_bool_str)
        .map(|enabled| Command::Set(toggle, enabled))
        .ok_or_else(|| "expected 'on' or 'off'".to_string())
}

/// Applies a command to the conversation and returns the text to print.
/// `Quit` is left to the caller.
pub fn apply_command(manager: &mut ConversationManager, command: Command) -> String {
    match command {
        Command::NewSession => {
            manager.new_session();
            format!("new session {}...", manager.short_session_id())
        }
        Command::ShowSession => {
            let options = manager.options();
            format!(
                "session {} | tools: {} | debug: {} | raw: {} | discovered tools: {}",
                manager.session_id(),
                on_off(options.show_tool_usage),
                on_off(options.show_debug),
                on_off(options.show_raw),
                manager.discovered_tools().len()
            )
        }
        Command::Set(toggle, enabled) => {
            let options = manager.options_mut();
            let (label, slot) = match toggle {
                Toggle::Tools => ("tool usage", &mut options.show_tool_usage),
                Toggle::Debug => ("debug info", &mut options.show_debug),
                Toggle::Raw => ("raw response", &mut options.show_raw),
            };
            *slot = enabled;
            format!("{label}: {}", on_off(enabled))
        }
        Command::History => manager
            .history()
            .iter()
            .map(|message| {
                let role = match message.role {
                    Role::User => "you",
                    Role::Assistant => "assistant",
                };
                format!("{role}> {}", message.content)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
