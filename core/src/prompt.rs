//! User-facing messages raised by the XML Store flows.
//!
//! The host UI owns message boxes and confirmation dialogs; flows only talk
//! to it through [`Prompt`].

use std::fmt::Display;

/// Blocking message and confirmation surface supplied by the host.
pub trait Prompt {
    /// Shows an informational or error message.
    fn notify(&mut self, message: &str);

    /// Asks a yes/no question; `true` means proceed.
    fn confirm(&mut self, message: &str) -> bool;
}

/// Headless prompt that routes messages to the log and answers every
/// confirmation with a fixed decision.
#[derive(Debug, Clone, Copy)]
pub struct LogPrompt {
    pub confirm_answer: bool,
}

impl LogPrompt {
    #[must_use]
    pub const fn declining() -> Self {
        Self {
            confirm_answer: false,
        }
    }

    #[must_use]
    pub const fn accepting() -> Self {
        Self {
            confirm_answer: true,
        }
    }
}

impl Prompt for LogPrompt {
    fn notify(&mut self, message: &str) {
        tracing::warn!("{message}");
    }

    fn confirm(&mut self, message: &str) -> bool {
        tracing::info!(answer = self.confirm_answer, "{message}");
        self.confirm_answer
    }
}

/// Reports `err` to the user and the log, then hands it back for returning.
pub(crate) fn report<E: Display>(prompt: &mut dyn Prompt, err: E) -> E {
    let message = err.to_string();
    tracing::warn!(%message, "XML Store operation aborted");
    prompt.notify(&message);
    err
}
