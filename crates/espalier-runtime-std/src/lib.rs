//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides the concrete [`TaskQueue`] implementation host event
//! loops integrate with: tasks park in a FIFO buffer, a wake flag records
//! that work is pending, and an optional waker callback lets a loop sleep
//! until the engine schedules something.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use espalier_core::TaskQueue;

/// Task queue for std event loops.
///
/// Drive it by polling [`StdQueue::take_wake_request`] (or installing a
/// waker) and calling [`StdQueue::run_until_idle`] once per turn.
#[derive(Default)]
pub struct StdQueue {
    tasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    wake_requested: Cell<bool>,
    waker: RefCell<Option<Rc<dyn Fn()>>>,
}

impl StdQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether work was scheduled since the last call, clearing the
    /// flag.
    pub fn take_wake_request(&self) -> bool {
        self.wake_requested.replace(false)
    }

    /// Registers a callback invoked whenever a task is enqueued.
    pub fn set_waker(&self, waker: impl Fn() + 'static) {
        *self.waker.borrow_mut() = Some(Rc::new(waker));
    }

    pub fn clear_waker(&self) {
        self.waker.borrow_mut().take();
    }

    fn wake(&self) {
        let waker = self.waker.borrow().clone();
        if let Some(waker) = waker {
            waker();
        }
    }

    /// Runs queued tasks until none remain, including tasks enqueued while
    /// draining. Returns the number of tasks executed.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

impl TaskQueue for StdQueue {
    fn enqueue(&self, task: Box<dyn FnOnce()>) {
        self.tasks.borrow_mut().push_back(task);
        self.wake_requested.set(true);
        self.wake();
    }
}

impl fmt::Debug for StdQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdQueue")
            .field("pending", &self.tasks.borrow().len())
            .field("wake_requested", &self.wake_requested.get())
            .finish()
    }
}
