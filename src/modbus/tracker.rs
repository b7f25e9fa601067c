use super::protocol::Command;

/// Remembers the most recently issued command. One slot, not a history.
#[derive(Debug, Default)]
pub struct CommandTracker {
    last: Option<Command>,
}

impl CommandTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, command: Command) {
        self.last = Some(command);
    }

    pub fn last(&self) -> Option<&Command> {
        self.last.as_ref()
    }
}
