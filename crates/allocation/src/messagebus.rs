//! Message bus: runs a command and everything it causes inside one unit
//! of work.
//!
//! Command handler failures abort the command; the unit of work is dropped
//! uncommitted. Event handler failures are logged and the remaining queue
//! still runs. Outbound events are published only after the unit of work
//! has committed.

use crate::commands::Command;
use crate::events::Event;
use crate::handlers::{self, Outbound};
use crate::publisher::EventPublisher;
use crate::unit_of_work::UnitOfWork;
use crate::AllocationResult;
use std::collections::VecDeque;
use tracing::{debug, error};

enum Message {
    Command(Command),
    Event(Event),
}

pub struct MessageBus<P> {
    publisher: P,
}

impl<P: EventPublisher> MessageBus<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Handle `command` in `uow`, committing once and then publishing the
    /// resulting outbound events in the order they were produced.
    pub async fn handle<U: UnitOfWork>(&self, command: Command, mut uow: U) -> AllocationResult<()> {
        let outbound = Self::run_to_completion(command, &mut uow)?;
        uow.commit()?;
        drop(uow);

        for message in outbound {
            self.publisher.publish(message.channel, &message.payload).await?;
        }
        Ok(())
    }

    fn run_to_completion(command: Command, uow: &mut dyn UnitOfWork) -> AllocationResult<Vec<Outbound>> {
        let mut queue = VecDeque::from([Message::Command(command)]);
        let mut outbound = Vec::new();

        while let Some(message) = queue.pop_front() {
            match message {
                Message::Command(command) => handle_command(command, uow)?,
                Message::Event(event) => {
                    if let Err(e) = handle_event(&event, uow, &mut outbound) {
                        error!(event = event.name(), error = %e, "Exception handling event");
                    }
                }
            }
            queue.extend(uow.collect_new_events().into_iter().map(Message::Event));
        }

        Ok(outbound)
    }
}

fn handle_command(command: Command, uow: &mut dyn UnitOfWork) -> AllocationResult<()> {
    debug!(command = command.name(), "Handling command");
    match command {
        Command::Allocate(command) => handlers::allocate(command, uow).map(|_| ()),
        Command::CreateBatch(command) => handlers::add_batch(command, uow),
        Command::ChangeBatchQuantity(command) => handlers::change_batch_quantity(command, uow),
    }
}

fn handle_event(
    event: &Event,
    uow: &mut dyn UnitOfWork,
    outbound: &mut Vec<Outbound>,
) -> AllocationResult<()> {
    debug!(event = event.name(), "Handling event");
    match event {
        Event::Allocated(event) => {
            handlers::log_allocated(event);
            outbound.push(handlers::publish_allocated_event(event)?);
        }
        Event::Deallocated(event) => handlers::reallocate(event, uow)?,
        Event::OutOfStock(event) => handlers::log_out_of_stock(event),
    }
    Ok(())
}
