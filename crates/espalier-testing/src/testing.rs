//! A ready-made bench: one in-memory host, one std task queue, helpers to
//! mount, dispatch events and drain updates the way a host loop would.

use std::cell::RefCell;
use std::rc::Rc;

use espalier_core::{
    mount, Event, Host, HostCounters, HostId, IntoTree, MemoryHost, Mount, MountError,
    MountOptions, StateSource, Store, TaskQueue, Value,
};
use espalier_runtime_std::StdQueue;

pub struct TestBed {
    host: Rc<RefCell<MemoryHost>>,
    queue: Rc<StdQueue>,
    root: HostId,
}

impl TestBed {
    /// A fresh bed with a single `<div id="app">` root.
    pub fn new() -> Self {
        let mut host = MemoryHost::new();
        let root = host.create_element("div");
        host.set_attribute(root, "id", "app")
            .expect("fresh root element");
        host.reset_counters();
        Self {
            host: Rc::new(RefCell::new(host)),
            queue: Rc::new(StdQueue::new()),
            root,
        }
    }

    pub fn host(&self) -> Rc<RefCell<MemoryHost>> {
        Rc::clone(&self.host)
    }

    pub fn queue(&self) -> Rc<StdQueue> {
        Rc::clone(&self.queue)
    }

    pub fn root(&self) -> HostId {
        self.root
    }

    /// Mounts onto the bed root with the bed's queue.
    pub fn mount<R, T>(&self, render: R) -> Mount<MemoryHost>
    where
        R: Fn(&Store) -> T + 'static,
        T: IntoTree,
    {
        self.mount_with(render, MountOptions::default())
            .expect("mount onto bed root")
    }

    /// Mounts with an initial state value.
    pub fn mount_with_state<R, T>(&self, render: R, state: Value) -> Mount<MemoryHost>
    where
        R: Fn(&Store) -> T + 'static,
        T: IntoTree,
    {
        self.mount_with(
            render,
            MountOptions {
                state: Some(StateSource::Live(state)),
                ..MountOptions::default()
            },
        )
        .expect("mount onto bed root")
    }

    pub fn mount_with<R, T>(
        &self,
        render: R,
        mut options: MountOptions,
    ) -> Result<Mount<MemoryHost>, MountError>
    where
        R: Fn(&Store) -> T + 'static,
        T: IntoTree,
    {
        if options.queue.is_none() {
            options.queue = Some(Rc::clone(&self.queue) as Rc<dyn TaskQueue>);
        }
        mount(Rc::clone(&self.host), self.root, render, options)
    }

    /// Drains the queue, running every pending update. Returns the number of
    /// tasks executed.
    pub fn flush(&self) -> usize {
        self.queue.run_until_idle()
    }

    /// Markup of the root's children.
    pub fn html(&self) -> String {
        self.host.borrow().inner_html(self.root)
    }

    /// Dispatches a payload-free event to a host node.
    pub fn dispatch(&self, id: HostId, event: &str) -> bool {
        self.dispatch_event(id, &Event::new(event))
    }

    pub fn dispatch_event(&self, id: HostId, event: &Event) -> bool {
        let host = self.host.borrow();
        host.dispatch(id, event)
    }

    /// Walks child indices from the root: `node_at(&[0, 1])` is the second
    /// child of the first child.
    pub fn node_at(&self, path: &[usize]) -> Option<HostId> {
        let host = self.host.borrow();
        let mut current = self.root;
        for &index in path {
            current = host.child_at(current, index)?;
        }
        Some(current)
    }

    pub fn counters(&self) -> HostCounters {
        self.host.borrow().counters()
    }

    pub fn reset_counters(&self) {
        self.host.borrow_mut().reset_counters();
    }
}

impl Default for TestBed {
    fn default() -> Self {
        Self::new()
    }
}
