//! Final commit message shaping.

/// Trailer appended to generated messages.
pub const SIGNATURE: &str = "auto generated by @ticoag/auto-commit";

/// A commit message ready to hand to `git commit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    /// First line of the message.
    pub subject: String,
    /// Non-empty lines after the subject, without the signature.
    pub body: Vec<String>,
    /// Whether this call added the signature. `false` when signing was
    /// disabled or the text already ended with [`SIGNATURE`]; check
    /// [`CommitMessage::is_signed`] to know whether the text carries it.
    pub signature_appended: bool,
    text: String,
}

impl CommitMessage {
    /// The literal message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the text ends with [`SIGNATURE`], whoever added it.
    pub fn is_signed(&self) -> bool {
        self.text.ends_with(SIGNATURE)
    }
}

/// Trim trailing whitespace and, when `append_signature` is set, append
/// [`SIGNATURE`] after a blank line unless the text already ends with it.
///
/// Applying this to its own output returns the same text.
pub fn post_process(raw: &str, append_signature: bool) -> CommitMessage {
    let trimmed = raw.trim_end();

    let signature_appended = append_signature && !trimmed.ends_with(SIGNATURE);
    let text = if signature_appended {
        format!("{trimmed}\n\n{SIGNATURE}")
    } else {
        trimmed.to_string()
    };

    let mut lines = text.lines();
    let subject = lines.next().unwrap_or_default().trim().to_string();
    let body = lines
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty() && l.trim() != SIGNATURE)
        .map(str::to_string)
        .collect();

    CommitMessage {
        subject,
        body,
        signature_appended,
        text,
    }
}
