//! Result channel for exchange outcomes
//!
//! A [`ResultChannel`] is registered on an
//! [`OidcClient`](crate::oidc::client::OidcClient) and receives exactly one
//! report per completed authorization-URL or token-exchange operation.
//! Reports may arrive on any runtime worker thread, concurrently with other
//! calls on the client.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::OidcError;
use crate::oidc::token::TokenResponse;

/// Outcome of one reported operation.
pub type ExchangeOutcome = std::result::Result<TokenResponse, OidcError>;

/// Consumer of operation outcomes.
pub trait ResultChannel: Send + Sync {
    /// Reports a failed operation. The failure name is `error.kind().name()`.
    fn report_failure(&self, error: OidcError);

    /// Reports tokens from a successful exchange.
    fn report_tokens(&self, tokens: TokenResponse);
}

/// Forwards outcomes over an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ExchangeOutcome>,
}

impl ChannelSink {
    /// Wraps an existing sender.
    pub fn new(tx: mpsc::UnboundedSender<ExchangeOutcome>) -> Self {
        Self { tx }
    }

    fn send(&self, outcome: ExchangeOutcome) {
        if self.tx.send(outcome).is_err() {
            tracing::debug!("Result receiver dropped; outcome discarded");
        }
    }
}

impl ResultChannel for ChannelSink {
    fn report_failure(&self, error: OidcError) {
        self.send(Err(error));
    }

    fn report_tokens(&self, tokens: TokenResponse) {
        self.send(Ok(tokens));
    }
}

/// Creates a [`ChannelSink`] and the receiver its outcomes arrive on.
///
/// # Examples
///
/// ```
/// use oidclite::oidc::channel::{unbounded, ResultChannel};
/// use oidclite::oidc::token::TokenResponse;
///
/// let (sink, mut rx) = unbounded();
/// sink.report_tokens(TokenResponse::default());
/// assert!(rx.try_recv().unwrap().is_ok());
/// ```
pub fn unbounded() -> (Arc<ChannelSink>, mpsc::UnboundedReceiver<ExchangeOutcome>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelSink::new(tx)), rx)
}
