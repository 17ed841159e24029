//! Dispatch loop.
//!
//! Messages are processed one at a time in arrival order. The next message
//! is not read until the current command's `bus.handle` has returned, so at
//! most one unit of work is ever open.

use crate::bus::CommandBus;
use crate::error::{ConsumerError, ConsumerResult};
use crate::transport::{PubSubTransport, RawMessage, Subscription};
use crate::translator::{translate, Translation};
use allocation::AllocationResult;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info};

/// What happens when a message cannot be translated or handled.
///
/// Transport failures end the loop under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Return the error from [`Dispatcher::run`].
    #[default]
    FailFast,
    /// Log the error and continue with the next message.
    SkipAndLog,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-fast" | "fail_fast" => Ok(FailurePolicy::FailFast),
            "skip-and-log" | "skip_and_log" => Ok(FailurePolicy::SkipAndLog),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::FailFast => f.write_str("fail-fast"),
            FailurePolicy::SkipAndLog => f.write_str("skip-and-log"),
        }
    }
}

/// How a single message was disposed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command was handled and committed.
    Handled,
    /// No binding for the channel; dropped silently.
    Unbound,
    /// Translation or handling failed and the policy skipped it.
    Skipped,
}

/// Feeds messages from a subscription into a command bus.
///
/// `new_uow` is called once per command, immediately before `bus.handle`.
pub struct Dispatcher<B, F> {
    bus: B,
    new_uow: F,
    policy: FailurePolicy,
}

impl<B, F> Dispatcher<B, F> {
    pub fn new(bus: B, new_uow: F, policy: FailurePolicy) -> Self {
        Self {
            bus,
            new_uow,
            policy,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B, F, U> Dispatcher<B, F>
where
    B: CommandBus<U>,
    F: Fn() -> AllocationResult<U> + Send + Sync,
    U: Send + 'static,
{
    /// Consume `subscription` until it fails.
    ///
    /// Only returns with an error: a transport failure, or under
    /// [`FailurePolicy::FailFast`] the first malformed message or handler
    /// failure. The subscription is dropped, closing its connection, on
    /// every exit path.
    pub async fn run<T: PubSubTransport>(&self, mut subscription: Subscription<T>) -> ConsumerResult<()> {
        info!(policy = %self.policy, "Starting dispatch loop");

        loop {
            let message = match subscription.listen().await {
                Ok(message) => message,
                Err(e) => {
                    error!(error = %e, "Subscription lost");
                    return Err(e);
                }
            };
            self.process_message(message).await?;
        }
    }

    /// Translate and handle one message, applying the failure policy.
    pub async fn process_message(&self, message: RawMessage) -> ConsumerResult<Outcome> {
        info!(
            channel = %message.channel,
            payload = %message.payload_text(),
            "Handling message"
        );

        match self.dispatch(&message).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => match self.policy {
                FailurePolicy::FailFast => {
                    error!(
                        channel = %message.channel,
                        payload = %message.payload_text(),
                        kind = e.kind(),
                        error = %e,
                        "Failed to process message"
                    );
                    Err(e)
                }
                FailurePolicy::SkipAndLog => {
                    error!(
                        channel = %message.channel,
                        payload = %message.payload_text(),
                        kind = e.kind(),
                        error = %e,
                        "Skipping message that failed processing"
                    );
                    Ok(Outcome::Skipped)
                }
            },
        }
    }

    async fn dispatch(&self, message: &RawMessage) -> ConsumerResult<Outcome> {
        let command = match translate(&message.channel, &message.payload)? {
            Translation::Command(command) => command,
            Translation::Unbound => {
                debug!(channel = %message.channel, "No binding for channel, dropping message");
                return Ok(Outcome::Unbound);
            }
        };

        let command_name = command.name();
        let uow = (self.new_uow)().map_err(ConsumerError::UnitOfWork)?;
        self.bus
            .handle(command, uow)
            .await
            .map_err(ConsumerError::Bus)?;

        debug!(command = command_name, "Command handled");
        Ok(Outcome::Handled)
    }
}
