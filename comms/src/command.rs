use serde::{Deserialize, Serialize};

/// Feed Command for starting to watch a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeCommand {
    // The room to watch.
    #[serde(rename = "r")]
    pub room: String,
}

/// Feed Command for no longer watching a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsubscribeCommand {
    // The room to stop watching.
    #[serde(rename = "r")]
    pub room: String,
}

/// Feed Command for closing the whole feed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuitCommand;

/// A command which can be sent to the realtime server by a single feed session.
/// A session may watch several rooms at once, each watched room produces its own snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_ct", rename_all = "snake_case")]
pub enum FeedCommand {
    Subscribe(SubscribeCommand),
    Unsubscribe(UnsubscribeCommand),
    Quit(QuitCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    // given a command enum, and an expect string, asserts that command is serialized / deserialized appropiately
    fn assert_command_serialization(command: &FeedCommand, expected: &str) {
        let serialized = serde_json::to_string(&command).unwrap();
        assert_eq!(serialized, expected);
        let deserialized: FeedCommand = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, *command);
    }

    #[test]
    fn test_subscribe_command() {
        let command = FeedCommand::Subscribe(SubscribeCommand {
            room: "AXFTR1".to_string(),
        });

        assert_command_serialization(&command, r#"{"_ct":"subscribe","r":"AXFTR1"}"#);
    }

    #[test]
    fn test_unsubscribe_command() {
        let command = FeedCommand::Unsubscribe(UnsubscribeCommand {
            room: "AXFTR1".to_string(),
        });

        assert_command_serialization(&command, r#"{"_ct":"unsubscribe","r":"AXFTR1"}"#);
    }

    #[test]
    fn test_quit_command() {
        let command = FeedCommand::Quit(QuitCommand);

        assert_command_serialization(&command, r#"{"_ct":"quit"}"#);
    }
}
