//! Command system for user actions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Command identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub String);

impl CommandId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Navigation commands
    pub const NAV_NEXT_ITEM: &'static str = "nav.next_item";
    pub const NAV_PREV_ITEM: &'static str = "nav.prev_item";

    // Triage commands
    pub const TRIAGE_KEEP: &'static str = "triage.keep";
    pub const TRIAGE_REJECT: &'static str = "triage.reject";
    pub const TRIAGE_RESET: &'static str = "triage.reset";

    // Viewer commands
    pub const VIEWER_CLOSE: &'static str = "viewer.close";
}

/// Command produced from an input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: CommandId,
}

impl Command {
    pub fn new(id: &str) -> Self {
        Self { id: CommandId::new(id) }
    }

    pub fn is(&self, id: &str) -> bool {
        self.id.as_str() == id
    }
}

/// Maps key names to commands
#[derive(Debug, Clone, Default)]
pub struct InputHandler {
    /// Key bindings: lowercased key string -> command ID
    bindings: HashMap<String, String>,
}

impl InputHandler {
    /// Create a new input handler from the config's command -> keys map
    pub fn new(bindings: &HashMap<String, Vec<String>>) -> Self {
        // Invert the bindings map: command -> keys becomes key -> command
        let mut key_to_command = HashMap::new();

        for (command, keys) in bindings {
            for key in keys {
                key_to_command.insert(key.to_lowercase(), command.clone());
            }
        }

        Self {
            bindings: key_to_command,
        }
    }

    /// Resolve a key name such as "Right" or "0"
    pub fn handle_key(&self, key: &str) -> Option<Command> {
        tracing::debug!("Key pressed: {}", key);

        self.bindings
            .get(&key.to_lowercase())
            .map(|cmd_id| Command::new(cmd_id))
    }
}
