/// What the user sees if a stream dies mid-flight or never starts.
pub const STREAM_ERROR_MSG: &str =
    "Error: Could not get a response or file size is more than 4MB";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub role: Role,
    pub content: String,
}

/// The visible conversation, with an explicit per-request state machine for
/// the streaming reply: either no entry is open, or exactly the trailing
/// assistant entry is. Updates replace the open entry's content with the
/// full running buffer; sealing closes it for good. Inspecting the last
/// element's role instead would be ambiguous the moment two requests could
/// interleave.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    open: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Whether a streaming reply is currently in progress.
    pub fn has_open_entry(&self) -> bool {
        self.open
    }

    /// Record what the user sent. The UI disables sending while a reply is
    /// open, but if one slips through the open entry is sealed first so a
    /// later update can never rewrite the user's message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.open = false;
        self.entries.push(Entry {
            role: Role::User,
            content: content.into(),
        });
    }

    /// Apply one accumulator update: replace the open assistant entry's
    /// content, or open a new one if none is.
    pub fn update_assistant(&mut self, running_buffer: &str) {
        if self.open {
            if let Some(last) = self.entries.last_mut() {
                last.content = running_buffer.to_string();
                return;
            }
        }
        self.entries.push(Entry {
            role: Role::Assistant,
            content: running_buffer.to_string(),
        });
        self.open = true;
    }

    /// The stream ended normally; the trailing entry is final.
    pub fn seal(&mut self) {
        self.open = false;
    }

    /// The stream failed. Whatever was in progress is replaced by a sealed
    /// entry carrying the fixed error message.
    pub fn fail(&mut self) {
        self.update_assistant(STREAM_ERROR_MSG);
        self.open = false;
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }
}
