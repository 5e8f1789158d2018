//! Command vocabulary and target parsing

use crate::controller::{ControllerError, ControllerResult};
use once_cell::sync::Lazy;
use regex::Regex;
use strum_macros::{Display, EnumIter, EnumString};

static TIMEOUT_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"t=\d+/?").expect("valid timeout hint regex"));

/// First word of a request line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CommandName {
    Get,
    Gets,
    Set,
    Delete,
    Flush,
    FlushAll,
    Stats,
    Version,
    Quit,
}

/// Transaction selector appended to a get target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum SubCommand {
    #[strum(serialize = "")]
    None,
    #[strum(serialize = "open")]
    Open,
    #[strum(serialize = "close")]
    Close,
    #[strum(serialize = "abort")]
    Abort,
    #[strum(serialize = "peek")]
    Peek,
    #[strum(serialize = "close/open")]
    CloseOpen,
}

impl SubCommand {
    /// Whether the read holds the item until close or abort
    pub fn is_reliable(self) -> bool {
        matches!(self, SubCommand::Open | SubCommand::CloseOpen)
    }
}

/// `queue` or `queue.group`; anything after a second dot is ignored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub queue: String,
    pub group: Option<String>,
}

impl Target {
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.splitn(3, '.');
        let queue = parts.next().unwrap_or_default().to_string();
        let group = parts
            .next()
            .filter(|group| !group.is_empty())
            .map(String::from);
        Self { queue, group }
    }
}

/// A parsed `get` target with its sub-command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCommand {
    pub target: Target,
    pub sub_command: SubCommand,
}

impl GetCommand {
    /// Parse `<queue>[.<group>][/<sub>[/<sub>]]`, dropping `t=<n>` hints
    pub fn parse(raw: &str) -> ControllerResult<Self> {
        let stripped = TIMEOUT_HINT.replace_all(raw, "");
        let (target, sub) = match stripped.split_once('/') {
            Some((target, sub)) => (target, sub.trim_matches('/')),
            None => (stripped.as_ref(), ""),
        };
        let sub_command = sub
            .parse::<SubCommand>()
            .map_err(|_| ControllerError::invalid_command())?;
        Ok(Self {
            target: Target::parse(target),
            sub_command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_command_names_are_case_insensitive() {
        assert_eq!("get".parse::<CommandName>().unwrap(), CommandName::Get);
        assert_eq!("GETS".parse::<CommandName>().unwrap(), CommandName::Gets);
        assert_eq!(
            "Flush_All".parse::<CommandName>().unwrap(),
            CommandName::FlushAll
        );
        assert!("unknown".parse::<CommandName>().is_err());
        for name in CommandName::iter() {
            assert_eq!(name.to_string().parse::<CommandName>().unwrap(), name);
        }
    }

    #[test]
    fn test_sub_commands_round_trip() {
        for sub in SubCommand::iter() {
            assert_eq!(sub.to_string().parse::<SubCommand>().unwrap(), sub);
        }
    }

    #[test]
    fn test_parse_plain_target() {
        let cmd = GetCommand::parse("work").unwrap();
        assert_eq!(cmd.target.queue, "work");
        assert_eq!(cmd.target.group, None);
        assert_eq!(cmd.sub_command, SubCommand::None);
    }

    #[test]
    fn test_parse_group_and_sub_commands() {
        let cmd = GetCommand::parse("work.readers/open").unwrap();
        assert_eq!(cmd.target.queue, "work");
        assert_eq!(cmd.target.group.as_deref(), Some("readers"));
        assert_eq!(cmd.sub_command, SubCommand::Open);

        let cmd = GetCommand::parse("work.readers.ignored/close/open").unwrap();
        assert_eq!(cmd.target.group.as_deref(), Some("readers"));
        assert_eq!(cmd.sub_command, SubCommand::CloseOpen);

        let cmd = GetCommand::parse("work/peek/").unwrap();
        assert_eq!(cmd.sub_command, SubCommand::Peek);
    }

    #[test]
    fn test_timeout_hints_are_stripped() {
        for raw in ["work/t=10/open", "work/open/t=10", "work/t=10/open/t=5"] {
            let cmd = GetCommand::parse(raw).unwrap();
            assert_eq!(cmd.target.queue, "work", "{raw}");
            assert_eq!(cmd.sub_command, SubCommand::Open, "{raw}");
        }
        let cmd = GetCommand::parse("work/t=100").unwrap();
        assert_eq!(cmd.sub_command, SubCommand::None);
    }

    #[test]
    fn test_invalid_sub_command() {
        let err = GetCommand::parse("work/bogus").unwrap_err();
        assert_eq!(err.reply_line().unwrap(), "ERROR Invalid command");
        assert!(GetCommand::parse("work/open/close").is_err());
    }

    #[test]
    fn test_empty_group_is_plain_queue() {
        assert_eq!(Target::parse("work.").group, None);
    }

    #[test]
    fn test_reliable_sub_commands() {
        assert!(SubCommand::Open.is_reliable());
        assert!(SubCommand::CloseOpen.is_reliable());
        assert!(!SubCommand::None.is_reliable());
        assert!(!SubCommand::Peek.is_reliable());
    }
}
