//! Human-readable log collected during an import run

/// Append-only list of messages produced by one run
///
/// Every message is also forwarded to the `log` facade so it shows up in
/// the process log as it happens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLog {
    messages: Vec<String>,
}

impl RunLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning or failure
    pub fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.messages.push(message);
    }

    /// Record an informational line
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.messages.push(message);
    }

    /// Get all messages in order
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if nothing was logged
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages joined by newlines
    pub fn text(&self) -> String {
        self.messages.join("\n")
    }
}
