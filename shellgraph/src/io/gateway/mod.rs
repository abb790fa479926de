//! Model gateway abstraction.
//!
//! The [`ModelGateway`] trait decouples the nodes from the completion backend.
//! The CLI picks [`OpenAiGateway`] or, with `--mock`, [`MockGateway`]; tests use
//! scripted gateways that replay canned replies.

mod mock;
mod openai;

use anyhow::Result;

use crate::io::prompt::Prompt;

pub use mock::MockGateway;
pub use openai::OpenAiGateway;

/// Prompt in, text out.
pub trait ModelGateway {
    /// Return the model's reply to `prompt`.
    ///
    /// Failures surface as [`crate::error::GatewayError`] (or
    /// [`crate::error::ConfigError`] for a missing credential) inside `anyhow`.
    fn complete(&self, prompt: &Prompt) -> Result<String>;
}

impl<G: ModelGateway + ?Sized> ModelGateway for Box<G> {
    fn complete(&self, prompt: &Prompt) -> Result<String> {
        (**self).complete(prompt)
    }
}
