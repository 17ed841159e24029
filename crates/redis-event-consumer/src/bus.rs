//! The command bus seam.
//!
//! The dispatcher only needs something that takes a command together with
//! the unit of work it should run in. On success the command has been
//! committed and its events republished.

use allocation::{AllocationResult, Command, EventPublisher, MessageBus, UnitOfWork};
use async_trait::async_trait;

#[async_trait]
pub trait CommandBus<U: Send + 'static>: Send + Sync {
    /// Handle `command` inside `uow`, consuming the unit of work.
    async fn handle(&self, command: Command, uow: U) -> AllocationResult<()>;
}

#[async_trait]
impl<P, U> CommandBus<U> for MessageBus<P>
where
    P: EventPublisher,
    U: UnitOfWork + 'static,
{
    async fn handle(&self, command: Command, uow: U) -> AllocationResult<()> {
        MessageBus::handle(self, command, uow).await
    }
}
