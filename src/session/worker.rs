use crossbeam_channel::Sender;

use crate::item::ItemId;

/// The controller's handle on a single worker.
///
/// Delivery is fire and forget. If a worker is gone, its commands are
/// dropped, the worker is expected to show up as a
/// [`WorkerEvent::Down`](super::WorkerEvent::Down) instead.
pub trait WorkerChannel {
    /// Ask the worker to run `items`, in order.
    fn run(&self, items: Vec<ItemId>);

    /// Tell the worker no more work is coming.
    fn shutdown(&self);

    /// Tell the worker the session failed and it should stop right away.
    fn abort(&self, reason: &str);
}

/// Commands sent to a worker by [`Sender<WorkerCommand>`], the channel based
/// [`WorkerChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    Run(Vec<ItemId>),
    Shutdown,
    Abort(String),
}

impl WorkerChannel for Sender<WorkerCommand> {
    fn run(&self, items: Vec<ItemId>) {
        let _ = self.send(WorkerCommand::Run(items));
    }

    fn shutdown(&self) {
        let _ = self.send(WorkerCommand::Shutdown);
    }

    fn abort(&self, reason: &str) {
        let _ = self.send(WorkerCommand::Abort(reason.to_string()));
    }
}
