//! Message parser - Splits prefixed text into a command token and arguments

/// A prefixed message split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased command token
    pub token: String,
    /// Remaining whitespace-separated words, case preserved
    pub args: Vec<String>,
}

/// Parses message text against the configured command prefix
pub struct MessageParser {
    command_prefix: String,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
        }
    }

    pub fn is_command(&self, text: &str) -> bool {
        !self.command_prefix.is_empty() && text.starts_with(&self.command_prefix)
    }

    /// Parse a command message. Returns `None` for text without the prefix
    /// or with nothing after it.
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        if !self.is_command(text) {
            return None;
        }

        let mut parts = text[self.command_prefix.len()..].split_whitespace();
        let token = parts.next()?.to_lowercase();
        let args = parts.map(str::to_string).collect();

        Some(ParsedCommand { token, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_token_and_args_on_whitespace_runs() {
        let parser = MessageParser::new("!");
        let parsed = parser.parse("!Sticker  pack\tAuthor \n name").unwrap();
        assert_eq!(parsed.token, "sticker");
        assert_eq!(parsed.args, vec!["pack", "Author", "name"]);
    }

    #[test]
    fn unprefixed_or_bare_prefix_is_not_a_command() {
        let parser = MessageParser::new("!");
        assert!(parser.parse("hello !ping").is_none());
        assert!(parser.parse("!").is_none());
        assert!(parser.parse("!   ").is_none());
        assert!(parser.parse(" !ping").is_none());
    }

    #[test]
    fn multi_character_prefix() {
        let parser = MessageParser::new("bot:");
        let parsed = parser.parse("bot:ping now").unwrap();
        assert_eq!(parsed.token, "ping");
        assert_eq!(parsed.args, vec!["now"]);
        assert!(parser.parse("bo:ping").is_none());
    }

    #[test]
    fn space_after_prefix_is_tolerated() {
        let parser = MessageParser::new("!");
        assert_eq!(parser.parse("! ping").unwrap().token, "ping");
    }
}
