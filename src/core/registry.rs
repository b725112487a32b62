//! Command registry - The immutable table of chat commands.
//!
//! The table is built once at startup and shared by reference with the dispatcher.
//! Lookups are case-insensitive and cover aliases.

use std::collections::HashMap;
use std::fmt::Write;

/// Help section a command is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Commands that talk to the academy platform
    Academy,
    /// Privileged commands, gated by the admin allow-list
    Admin,
    /// Everything else
    Misc,
}

impl Category {
    /// Title used in the help output.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Academy => "Academy",
            Self::Admin => "Admin",
            Self::Misc => "Misc",
        }
    }
}

/// Every command the bot knows; the dispatcher handles each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Link the caller to an academy account
    Link,
    /// Remove the caller's link
    Unlink,
    /// Show the progress of a game
    Status,
    /// Show the caller's level in a game
    Level,
    /// Show the card table of a game
    Table,
    /// Split players into games
    Distribute,
    /// Show the running version
    Version,
    /// Liveness check
    Test,
    /// Write text on the fura picture
    Fura,
    /// List the commands
    Help,
    /// Evaluate an expression
    Eval,
    /// Restart the bot
    Restart,
}

/// Metadata of one registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Primary name
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Help section
    pub category: Category,
    /// Argument synopsis, empty when the command takes none
    pub usage: &'static str,
    /// One line description
    pub help_text: &'static str,
    /// Handler selector
    pub kind: CommandKind,
}

impl CommandDescriptor {
    /// `"!status [game_id]"` style usage line.
    #[must_use]
    pub fn usage_line(&self, prefix: &str) -> String {
        if self.usage.is_empty() {
            format!("{prefix}{}", self.name)
        } else {
            format!("{prefix}{} {}", self.name, self.usage)
        }
    }
}

const COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "link",
        aliases: &[],
        category: Category::Academy,
        usage: "<academy_id>",
        help_text: "Link your Discord account with your academy account.",
        kind: CommandKind::Link,
    },
    CommandDescriptor {
        name: "unlink",
        aliases: &["ul"],
        category: Category::Academy,
        usage: "",
        help_text: "Remove the link to your academy account.",
        kind: CommandKind::Unlink,
    },
    CommandDescriptor {
        name: "status",
        aliases: &["s"],
        category: Category::Academy,
        usage: "[game_id]",
        help_text: "Show the last card and whose turn it is.",
        kind: CommandKind::Status,
    },
    CommandDescriptor {
        name: "level",
        aliases: &["l"],
        category: Category::Academy,
        usage: "[game_id]",
        help_text: "Show how much you must have drunk to be on level.",
        kind: CommandKind::Level,
    },
    CommandDescriptor {
        name: "table",
        aliases: &["t"],
        category: Category::Academy,
        usage: "[game_id]",
        help_text: "Show the cards drawn so far, round by round.",
        kind: CommandKind::Table,
    },
    CommandDescriptor {
        name: "distribute",
        aliases: &["d"],
        category: Category::Academy,
        usage: "<player[=player...]>...",
        help_text: "Split players into games; players joined by = play together.",
        kind: CommandKind::Distribute,
    },
    CommandDescriptor {
        name: "version",
        aliases: &["v"],
        category: Category::Misc,
        usage: "",
        help_text: "Show the version the bot is running.",
        kind: CommandKind::Version,
    },
    CommandDescriptor {
        name: "test",
        aliases: &[],
        category: Category::Misc,
        usage: "",
        help_text: "Check that the bot is alive.",
        kind: CommandKind::Test,
    },
    CommandDescriptor {
        name: "fura",
        aliases: &[],
        category: Category::Misc,
        usage: "<text>",
        help_text: "Write some text on the fura picture.",
        kind: CommandKind::Fura,
    },
    CommandDescriptor {
        name: "help",
        aliases: &["h"],
        category: Category::Misc,
        usage: "",
        help_text: "Show this help message.",
        kind: CommandKind::Help,
    },
    CommandDescriptor {
        name: "eval",
        aliases: &[],
        category: Category::Admin,
        usage: "<expression>",
        help_text: "Evaluate an arithmetic expression.",
        kind: CommandKind::Eval,
    },
    CommandDescriptor {
        name: "restart",
        aliases: &[],
        category: Category::Admin,
        usage: "",
        help_text: "Restart the bot.",
        kind: CommandKind::Restart,
    },
];

/// Lookup table from command names and aliases to descriptors.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: Vec<CommandDescriptor>,
    index: HashMap<String, usize>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(COMMANDS.to_vec())
    }
}

impl CommandRegistry {
    /// Builds a registry from `commands`. Later entries never shadow earlier names.
    #[must_use]
    pub fn new(commands: Vec<CommandDescriptor>) -> Self {
        let mut index = HashMap::new();
        for (position, command) in commands.iter().enumerate() {
            for name in std::iter::once(command.name).chain(command.aliases.iter().copied()) {
                index.entry(name.to_lowercase()).or_insert(position);
            }
        }
        Self { commands, index }
    }

    /// Finds the command named `token`, ignoring case.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<&CommandDescriptor> {
        self.index
            .get(&token.to_lowercase())
            .and_then(|&position| self.commands.get(position))
    }

    /// Help text grouped by category.
    pub fn help_text(&self, prefix: &str) -> Result<String, std::fmt::Error> {
        let mut categories: Vec<Category> = self.commands.iter().map(|c| c.category).collect();
        categories.sort();
        categories.dedup();

        let mut out = String::new();
        for category in categories {
            writeln!(out, "**{}**", category.title())?;
            for command in self.commands.iter().filter(|c| c.category == category) {
                write!(out, "• `{}` - {}", command.usage_line(prefix), command.help_text)?;
                if !command.aliases.is_empty() {
                    let aliases: Vec<String> = command
                        .aliases
                        .iter()
                        .map(|alias| format!("`{prefix}{alias}`"))
                        .collect();
                    write!(out, " (alias {})", aliases.join(", "))?;
                }
                writeln!(out)?;
            }
            writeln!(out)?;
        }
        Ok(out.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = CommandRegistry::default();
        assert_eq!(registry.lookup("STATUS").unwrap().kind, CommandKind::Status);
        assert_eq!(registry.lookup("Link").unwrap().kind, CommandKind::Link);
    }

    #[test]
    fn test_lookup_aliases() {
        let registry = CommandRegistry::default();
        assert_eq!(registry.lookup("s").unwrap().kind, CommandKind::Status);
        assert_eq!(registry.lookup("UL").unwrap().kind, CommandKind::Unlink);
        assert_eq!(registry.lookup("d").unwrap().kind, CommandKind::Distribute);
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = CommandRegistry::default();
        assert!(registry.lookup("zoom").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_names_are_unique() {
        let registry = CommandRegistry::default();
        let names: usize = registry.commands.iter().map(|c| 1 + c.aliases.len()).sum();
        assert_eq!(registry.index.len(), names);
    }

    #[test]
    fn test_first_registration_wins() {
        let duplicate = CommandDescriptor {
            name: "STATUS",
            aliases: &[],
            category: Category::Misc,
            usage: "",
            help_text: "",
            kind: CommandKind::Test,
        };
        let mut commands = COMMANDS.to_vec();
        commands.push(duplicate);
        let registry = CommandRegistry::new(commands);
        assert_eq!(registry.lookup("status").unwrap().kind, CommandKind::Status);
    }

    #[test]
    fn test_help_text_groups_categories() {
        let help = CommandRegistry::default().help_text("!").unwrap();
        let academy = help.find("**Academy**").unwrap();
        let admin = help.find("**Admin**").unwrap();
        let misc = help.find("**Misc**").unwrap();
        assert!(academy < admin && admin < misc);
        assert!(help.contains("`!status [game_id]`"));
        assert!(help.contains("(alias `!s`)"));
        assert!(help.contains("`!eval <expression>`"));
        assert!(help.contains("`!fura <text>`"));
    }
}
