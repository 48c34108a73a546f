//! Deferred task execution.
//!
//! Replay of a cached outcome to a late subscriber must happen after the
//! `subscribe` call returns. Hosts provide that "next tick" through
//! [`Scheduler`]; [`MicrotaskQueue`] is a queue the host drains itself.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

pub type Task = Box<dyn FnOnce()>;

/// Runs tasks at a later point on the same thread.
pub trait Scheduler {
    fn defer(&self, task: Task);
}

/// FIFO microtask queue, drained with [`MicrotaskQueue::run_until_idle`].
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct MicrotaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run queued tasks, including ones queued while draining.
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }
}

impl Scheduler for MicrotaskQueue {
    fn defer(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_tasks_run_in_fifo_order() {
        let queue = MicrotaskQueue::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let order = Rc::clone(&order);
            queue.defer(Box::new(move || order.borrow_mut().push(i)));
        }

        assert_eq!(queue.pending(), 3);
        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_tasks_queued_while_draining_also_run() {
        let queue = MicrotaskQueue::new();
        let hits = Rc::new(Cell::new(0));

        let inner_queue = queue.clone();
        let inner_hits = Rc::clone(&hits);
        queue.defer(Box::new(move || {
            inner_hits.set(inner_hits.get() + 1);
            let hits = Rc::clone(&inner_hits);
            inner_queue.defer(Box::new(move || hits.set(hits.get() + 1)));
        }));

        assert_eq!(queue.run_until_idle(), 2);
        assert_eq!(hits.get(), 2);
    }
}
