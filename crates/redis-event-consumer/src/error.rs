//! Error types for the event consumer.

use crate::translator::MalformedMessage;
use allocation::AllocationError;
use thiserror::Error;

/// Consumer error type.
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// The subscription could not be opened or the connection was lost
    #[error("Transport connection error: {0}")]
    TransportConnection(String),

    /// Redis connection or protocol error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A bound channel carried a payload that is not a valid command
    #[error(transparent)]
    MalformedMessage(#[from] MalformedMessage),

    /// A unit of work could not be started for a command
    #[error("Unit of work error: {0}")]
    UnitOfWork(#[source] AllocationError),

    /// The command bus rejected or failed to handle a command
    #[error("Command bus error: {0}")]
    Bus(#[source] AllocationError),

    /// Persistence could not be initialized at startup
    #[error("Persistence error: {0}")]
    Persistence(#[source] AllocationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsumerError {
    /// Transport failures end the subscription regardless of failure policy.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ConsumerError::TransportConnection(_) | ConsumerError::Redis(_)
        )
    }

    /// Short classification used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConsumerError::TransportConnection(_) | ConsumerError::Redis(_) => "transport",
            ConsumerError::MalformedMessage(_) => "malformed",
            ConsumerError::UnitOfWork(_) => "unit_of_work",
            ConsumerError::Bus(_) => "handler",
            ConsumerError::Persistence(_) => "persistence",
            ConsumerError::Config(_) => "config",
        }
    }
}

/// Result type for consumer operations.
pub type ConsumerResult<T> = Result<T, ConsumerError>;
