// Board registry
// Maps fully-qualified board names (FQBNs) to human-readable metadata

use serde::Serialize;

/// A single supported target board.
#[derive(Debug, Clone, Serialize)]
pub struct BoardDescriptor {
    pub fqbn: String,
    pub name: String,
}

/// Registry of supported boards.
///
/// This is the authoritative source for which FQBNs the service accepts.
/// Lookups are exact string matches: FQBN variants that differ only by a
/// configuration suffix (e.g. the old-bootloader Nano) are independent
/// entries. Backed by a `Vec` so enumeration and the "Supported: ..."
/// rejection message keep insertion order.
#[derive(Debug, Clone)]
pub struct BoardRegistry {
    boards: Vec<BoardDescriptor>,
}

impl BoardRegistry {
    /// Built-in board set. Constructed once at startup and injected into the
    /// HTTP state; nothing else in the service holds board data.
    pub fn builtin() -> Self {
        let boards = [
            ("arduino:avr:uno", "Arduino Uno"),
            ("arduino:avr:nano", "Arduino Nano"),
            ("arduino:avr:nano:cpu=atmega328old", "Arduino Nano (old bootloader)"),
            ("arduino:avr:mega", "Arduino Mega 2560"),
            ("arduino:avr:leonardo", "Arduino Leonardo"),
            ("arduino:avr:micro", "Arduino Micro"),
            ("arduino:avr:pro", "Arduino Pro Mini"),
        ]
        .into_iter()
        .map(|(fqbn, name)| BoardDescriptor {
            fqbn: fqbn.to_string(),
            name: name.to_string(),
        })
        .collect();

        Self { boards }
    }

    /// Exact-match lookup. No prefix or fuzzy matching.
    pub fn lookup(&self, fqbn: &str) -> Option<&BoardDescriptor> {
        self.boards.iter().find(|b| b.fqbn == fqbn)
    }

    /// All boards in registration order.
    pub fn all(&self) -> &[BoardDescriptor] {
        &self.boards
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Comma-separated FQBN list in registration order, for rejection
    /// messages.
    pub fn supported_list(&self) -> String {
        self.boards
            .iter()
            .map(|b| b.fqbn.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
