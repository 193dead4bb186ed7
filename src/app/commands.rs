//! The slash command table.

/// What a command does; the controller matches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandAction {
    Help,
    ListGuilds,
    SetGuild,
    ListChannels,
    SetChannel,
    Read,
    SelfMessages,
    Delete,
    Edit,
    Multiline,
    Attach,
    Files,
    Download,
    Preview,
    Clear,
    Quit,
}

/// One row of the command table.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    /// Full name without the slash.
    pub name: &'static str,
    pub alias: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    pub action: CommandAction,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "help", alias: "h", usage: "", summary: "Show this help", action: CommandAction::Help },
    CommandSpec { name: "listguilds", alias: "lg", usage: "", summary: "List guilds the bot is in", action: CommandAction::ListGuilds },
    CommandSpec { name: "setguild", alias: "sg", usage: "<index|id|name>", summary: "Select a guild", action: CommandAction::SetGuild },
    CommandSpec { name: "listchannels", alias: "lc", usage: "", summary: "List text channels of the current guild", action: CommandAction::ListChannels },
    CommandSpec { name: "setchannel", alias: "sc", usage: "<index|id|name>", summary: "Select a channel and show recent messages", action: CommandAction::SetChannel },
    CommandSpec { name: "read", alias: "r", usage: "[1-100]", summary: "Show recent messages (default 20)", action: CommandAction::Read },
    CommandSpec { name: "self_messages", alias: "sm", usage: "[1-100]", summary: "List the bot's recent messages (default 50 scanned)", action: CommandAction::SelfMessages },
    CommandSpec { name: "delete", alias: "d", usage: "<index>", summary: "Delete a message from /self_messages", action: CommandAction::Delete },
    CommandSpec { name: "edit", alias: "e", usage: "<index>", summary: "Edit a message from /self_messages", action: CommandAction::Edit },
    CommandSpec { name: "multiline", alias: "ml", usage: "", summary: "Compose a multi-line message (end with @END)", action: CommandAction::Multiline },
    CommandSpec { name: "attach", alias: "a", usage: "[path] [caption]", summary: "Upload a file", action: CommandAction::Attach },
    CommandSpec { name: "files", alias: "f", usage: "[1-200]", summary: "List attachments in recent messages (default 50 scanned)", action: CommandAction::Files },
    CommandSpec { name: "download", alias: "dl", usage: "<index>", summary: "Download a file from /files", action: CommandAction::Download },
    CommandSpec { name: "preview", alias: "p", usage: "<index>", summary: "Preview an image from /files", action: CommandAction::Preview },
    CommandSpec { name: "clear", alias: "cls", usage: "", summary: "Clear the log", action: CommandAction::Clear },
    CommandSpec { name: "quit", alias: "q", usage: "", summary: "Disconnect and exit", action: CommandAction::Quit },
];

/// Command names starting with `prefix`.
#[must_use]
pub fn complete(prefix: &str) -> Vec<&'static str> {
    let prefix = prefix.to_lowercase();
    COMMANDS
        .iter()
        .map(|c| c.name)
        .filter(|name| name.starts_with(&prefix))
        .collect()
}

/// Formatted command reference for `/help`.
#[must_use]
pub fn help_text() -> String {
    let mut out = String::from("Commands:\n");
    for c in COMMANDS {
        let invocation = format!("/{} (/{}) {}", c.name, c.alias, c.usage);
        out.push_str(&format!("  {:<38} {}\n", invocation.trim_end(), c.summary));
    }
    out.push_str("Anything not starting with / is sent to the current channel.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_and_aliases_are_unique() {
        let mut seen = HashSet::new();
        for c in COMMANDS {
            assert!(seen.insert(c.name), "duplicate {}", c.name);
            assert!(seen.insert(c.alias), "duplicate {}", c.alias);
        }
    }

    #[test]
    fn test_complete_by_prefix() {
        assert_eq!(complete("se"), vec!["setguild", "setchannel", "self_messages"]);
        assert_eq!(complete("q"), vec!["quit"]);
        assert!(complete("zz").is_empty());
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for c in COMMANDS {
            assert!(help.contains(&format!("/{}", c.name)));
        }
    }
}
