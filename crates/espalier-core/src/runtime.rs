//! Update scheduling.
//!
//! State mutations never re-render inline; they flip the scheduler to
//! `Pending` and park one update task on the platform queue. Everything that
//! happens within the same synchronous turn coalesces into that one task,
//! which observes the final state when it runs.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::platform::TaskQueue;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Pending,
    Updating,
}

pub(crate) struct SchedulerInner {
    phase: Cell<Phase>,
    // Set when a mutation lands while an update pass is running.
    dirty: Cell<bool>,
    // Set when scheduling happened inside an event dispatch.
    deferred: Cell<bool>,
    dispatch_depth: Cell<usize>,
    stopped: Cell<bool>,
    queue: Rc<dyn TaskQueue>,
    update: RefCell<Option<Rc<dyn Fn()>>>,
    weak_self: RefCell<Weak<SchedulerInner>>,
}

impl SchedulerInner {
    pub(crate) fn new(queue: Rc<dyn TaskQueue>) -> Rc<Self> {
        let inner = Rc::new(Self {
            phase: Cell::new(Phase::Idle),
            dirty: Cell::new(false),
            deferred: Cell::new(false),
            dispatch_depth: Cell::new(0),
            stopped: Cell::new(false),
            queue,
            update: RefCell::new(None),
            weak_self: RefCell::new(Weak::new()),
        });
        *inner.weak_self.borrow_mut() = Rc::downgrade(&inner);
        inner
    }

    pub(crate) fn set_update(&self, update: Rc<dyn Fn()>) {
        *self.update.borrow_mut() = Some(update);
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.phase.get() != Phase::Idle
    }

    /// Requests a re-render. Coalesced: while one is pending or running this
    /// only records the request.
    pub(crate) fn invalidate(&self) {
        if self.stopped.get() {
            return;
        }
        match self.phase.get() {
            Phase::Updating => self.dirty.set(true),
            Phase::Pending => {}
            Phase::Idle => {
                self.phase.set(Phase::Pending);
                if self.dispatch_depth.get() > 0 {
                    self.deferred.set(true);
                } else {
                    self.enqueue();
                }
            }
        }
    }

    fn enqueue(&self) {
        let weak = self.weak_self.borrow().clone();
        self.queue.enqueue(Box::new(move || {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.run_update();
            }
        }));
    }

    pub(crate) fn run_update(&self) {
        if self.stopped.get() || self.phase.get() != Phase::Pending {
            return;
        }
        self.phase.set(Phase::Updating);
        loop {
            let update = self.update.borrow().clone();
            let Some(update) = update else {
                break;
            };
            update();
            if self.stopped.get() {
                break;
            }
            if self.dirty.replace(false) {
                // Re-entrant mutation (a render or mid-patch listener wrote
                // state). Policy: run another pass right away.
                log::warn!("state mutated during update; running another pass");
                continue;
            }
            break;
        }
        self.phase.set(Phase::Idle);
    }

    /// Marks an event handler in flight; scheduling is deferred until the
    /// outermost handler returns.
    pub(crate) fn enter_dispatch(&self) {
        self.dispatch_depth.set(self.dispatch_depth.get() + 1);
    }

    pub(crate) fn exit_dispatch(&self) {
        let depth = self.dispatch_depth.get().saturating_sub(1);
        self.dispatch_depth.set(depth);
        if depth == 0 && self.deferred.replace(false) && !self.stopped.get() {
            if self.phase.get() == Phase::Pending {
                self.enqueue();
            }
        }
    }

    /// Stops the scheduler permanently. Returns whether this call was the
    /// one that stopped it.
    pub(crate) fn stop(&self) -> bool {
        if self.stopped.replace(true) {
            return false;
        }
        self.update.borrow_mut().take();
        true
    }
}

/// Context threaded through reconciliation: the store listeners receive and
/// the scheduler their dispatches must guard.
#[derive(Clone)]
pub(crate) struct PatchCtx {
    pub(crate) store: Store,
    pub(crate) scheduler: Weak<SchedulerInner>,
}

impl PatchCtx {
    pub(crate) fn new(store: Store, scheduler: &Rc<SchedulerInner>) -> Self {
        Self {
            store,
            scheduler: Rc::downgrade(scheduler),
        }
    }

    /// Context with no scheduler behind it (state-free patching,
    /// stringification).
    pub(crate) fn detached(store: Store) -> Self {
        Self {
            store,
            scheduler: Weak::new(),
        }
    }
}
