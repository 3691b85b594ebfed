use comms::room::{MessageCollection, RoomMessage, RoomValue};

/// A single room, its messages kept in arrival order
#[derive(Debug, Clone)]
pub struct Room {
    owner: String,
    messages: Vec<RoomMessage>,
}

impl Room {
    pub fn new(owner: &str) -> Self {
        Room {
            owner: String::from(owner),
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[RoomMessage] {
        &self.messages
    }

    /// The value published on the realtime feed, `messages` is left out until the first one
    pub fn value(&self) -> RoomValue {
        RoomValue {
            owner: self.owner.clone(),
            messages: if self.messages.is_empty() {
                None
            } else {
                Some(MessageCollection::from_messages(&self.messages))
            },
        }
    }

    /// Appends a message stamped with `now`, or with the last timestamp if the clock went back.
    pub fn push(&mut self, from: &str, message: &str, now: i64) -> &RoomMessage {
        let timestamp = self
            .messages
            .last()
            .map(|last| last.timestamp.max(now))
            .unwrap_or(now);

        self.messages.push(RoomMessage {
            from: String::from(from),
            message: String::from(message),
            timestamp,
        });

        &self.messages[self.messages.len() - 1]
    }
}
