#![doc = r"Core virtual-tree rendering engine for the Espalier experiment."]

pub mod collections;
pub mod host;
mod memo;
pub mod node;
mod patch;
pub mod platform;
mod reconcile;
mod runtime;
pub mod selector;
pub mod serial;
pub mod store;
pub mod value;

pub use host::{Host, HostCounters, HostError, HostHandler, HostId, MemoryHost, PropValue};
pub use node::{
    create_node, listener, memo, AttrMap, AttrValue, Content, Element, Event, IntoTree,
    ListenerFn, Memo, MemoRender, NodeArg,
};
pub use platform::{DefaultQueue, TaskQueue};
pub use selector::selector;
pub use serial::{parse_state, parse_tree, render_to_string, tree_to_json};
pub use store::{IntoPath, PathSeg, Store};
pub use value::Value;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::memo::MemoTable;
use crate::reconcile::reconcile_children;
use crate::runtime::{PatchCtx, SchedulerInner};

/// Where to mount: a host node id or a selector resolved via
/// [`Host::select`].
#[derive(Debug, Clone)]
pub enum Target {
    Node(HostId),
    Selector(String),
}

impl From<HostId> for Target {
    fn from(id: HostId) -> Self {
        Target::Node(id)
    }
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_owned())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

/// Initial state: a live value or its string-encoded form.
#[derive(Debug, Clone)]
pub enum StateSource {
    Live(Value),
    Serialized(String),
}

/// Previous tree: a live sequence or its string-encoded form.
#[derive(Debug, Clone)]
pub enum TreeSource {
    Tree(Vec<Content>),
    Serialized(String),
}

/// Optional mount inputs. With no queue injected the mount owns a
/// [`DefaultQueue`] drained through [`Mount::run_pending_updates`].
#[derive(Default)]
pub struct MountOptions {
    pub state: Option<StateSource>,
    pub previous: Option<TreeSource>,
    pub queue: Option<Rc<dyn TaskQueue>>,
}

impl MountOptions {
    pub fn with_state(state: impl Into<Value>) -> Self {
        Self {
            state: Some(StateSource::Live(state.into())),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub enum MountError {
    TargetNotFound { selector: String },
    Host(HostError),
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::TargetNotFound { selector } => {
                write!(f, "no host node matches selector {selector:?}")
            }
            MountError::Host(err) => write!(f, "host failure during mount: {err}"),
        }
    }
}

impl std::error::Error for MountError {}

impl From<HostError> for MountError {
    fn from(err: HostError) -> Self {
        MountError::Host(err)
    }
}

/// Live mount: owns the previous tree, the memo cache generations and the
/// update scheduler for one host subtree.
pub struct Mount<H: Host + 'static> {
    host: Rc<RefCell<H>>,
    root: HostId,
    store: Store,
    scheduler: Rc<SchedulerInner>,
    prev: Rc<RefCell<Vec<Content>>>,
    memo: Rc<RefCell<MemoTable>>,
    owned_queue: Option<Rc<DefaultQueue>>,
}

/// Mounts `render` onto `target`, performing the initial reconciliation
/// synchronously.
///
/// Afterwards any mutation of the returned [`Store`] (or an explicit
/// [`Mount::request_update`]) schedules one coalesced re-render on the task
/// queue.
pub fn mount<H, R, T>(
    host: Rc<RefCell<H>>,
    target: impl Into<Target>,
    render: R,
    options: MountOptions,
) -> Result<Mount<H>, MountError>
where
    H: Host + 'static,
    R: Fn(&Store) -> T + 'static,
    T: IntoTree,
{
    let root = resolve_target(&host, target.into())?;
    let store = match options.state {
        Some(StateSource::Live(value)) => Store::new(value),
        Some(StateSource::Serialized(json)) => match serial::parse_state(&json) {
            Ok(value) => Store::new(value),
            Err(err) => {
                log::warn!("malformed serialized state, starting empty: {err}");
                Store::new(Value::Map(IndexMap::new()))
            }
        },
        None => Store::new(Value::Map(IndexMap::new())),
    };
    let previous = resolve_previous(&host, root, options.previous);

    let (queue, owned_queue): (Rc<dyn TaskQueue>, Option<Rc<DefaultQueue>>) =
        match options.queue {
            Some(queue) => (queue, None),
            None => {
                let queue = Rc::new(DefaultQueue::new());
                (Rc::clone(&queue) as Rc<dyn TaskQueue>, Some(queue))
            }
        };

    let render_fn: Rc<dyn Fn(&Store) -> Vec<Content>> =
        Rc::new(move |store| render(store).into_tree());
    let scheduler = SchedulerInner::new(queue);
    let prev = Rc::new(RefCell::new(previous));
    let memo = Rc::new(RefCell::new(MemoTable::new()));

    let update: Rc<dyn Fn()> = {
        let host = Rc::clone(&host);
        let store = store.clone();
        let prev = Rc::clone(&prev);
        let memo = Rc::clone(&memo);
        let render_fn = Rc::clone(&render_fn);
        let scheduler = Rc::downgrade(&scheduler);
        Rc::new(move || {
            let ctx = PatchCtx {
                store: store.clone(),
                scheduler: scheduler.clone(),
            };
            let mut host = host.borrow_mut();
            let mut prev = prev.borrow_mut();
            let mut memo = memo.borrow_mut();
            if let Err(err) = run_pass(
                &mut *host,
                root,
                render_fn.as_ref(),
                &store,
                &mut prev,
                &mut memo,
                &ctx,
            ) {
                log::error!("scheduled update failed: {err}");
            }
        })
    };
    scheduler.set_update(update);
    {
        let scheduler = Rc::downgrade(&scheduler);
        store.bind(move || {
            if let Some(scheduler) = scheduler.upgrade() {
                scheduler.invalidate();
            }
        });
    }

    {
        let ctx = PatchCtx::new(store.clone(), &scheduler);
        let mut host_ref = host.borrow_mut();
        run_pass(
            &mut *host_ref,
            root,
            render_fn.as_ref(),
            &store,
            &mut prev.borrow_mut(),
            &mut memo.borrow_mut(),
            &ctx,
        )?;
    }

    Ok(Mount {
        host,
        root,
        store,
        scheduler,
        prev,
        memo,
        owned_queue,
    })
}

impl<H: Host + 'static> Mount<H> {
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn root(&self) -> HostId {
        self.root
    }

    pub fn host(&self) -> &Rc<RefCell<H>> {
        &self.host
    }

    /// Schedules a re-render, coalescing with any already pending.
    pub fn request_update(&self) {
        self.scheduler.invalidate();
    }

    pub fn needs_update(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Drains the mount-owned queue. A no-op when a queue was injected via
    /// [`MountOptions`]; the environment drains that one. Returns the number
    /// of tasks run.
    pub fn run_pending_updates(&self) -> usize {
        self.owned_queue
            .as_ref()
            .map(|queue| queue.run_until_idle())
            .unwrap_or(0)
    }

    /// Stops scheduling, detaches the store callback and clears the host
    /// subtree. Subsequent mutations and update requests are no-ops.
    /// Idempotent.
    pub fn unmount(&self) {
        if !self.scheduler.stop() {
            return;
        }
        self.store.unbind();
        self.memo.borrow_mut().clear();
        self.prev.borrow_mut().clear();
        let mut host = self.host.borrow_mut();
        for index in (0..host.child_count(self.root)).rev() {
            let _ = host.remove_child(self.root, index);
        }
    }
}

/// State-free patcher: reconciliation without a reactive store or
/// scheduler, for callers that manage their own state and update timing.
pub struct Patcher<H: Host + 'static> {
    host: Rc<RefCell<H>>,
    root: HostId,
    prev: Vec<Content>,
    memo: MemoTable,
    store: Store,
}

pub fn prepare_patcher<H: Host + 'static>(
    host: Rc<RefCell<H>>,
    target: impl Into<Target>,
    previous: Option<TreeSource>,
) -> Result<Patcher<H>, MountError> {
    let root = resolve_target(&host, target.into())?;
    let prev = resolve_previous(&host, root, previous);
    Ok(Patcher {
        host,
        root,
        prev,
        memo: MemoTable::new(),
        store: Store::detached(),
    })
}

impl<H: Host + 'static> Patcher<H> {
    pub fn root(&self) -> HostId {
        self.root
    }

    /// Reconciles the host subtree against `tree`.
    pub fn apply(&mut self, tree: impl IntoTree) -> Result<(), HostError> {
        let mut next = tree.into_tree();
        let ctx = PatchCtx::detached(self.store.clone());
        let result = {
            let mut host = self.host.borrow_mut();
            reconcile_children(
                &mut *host,
                self.root,
                &mut next,
                &mut self.prev,
                &mut self.memo,
                &ctx,
            )
        };
        self.prev = next;
        self.memo.swap();
        result
    }
}

fn resolve_target<H: Host>(host: &Rc<RefCell<H>>, target: Target) -> Result<HostId, MountError> {
    match target {
        Target::Node(id) => Ok(id),
        Target::Selector(selector) => host
            .borrow()
            .select(&selector)
            .ok_or(MountError::TargetNotFound { selector }),
    }
}

fn resolve_previous<H: Host>(
    host: &Rc<RefCell<H>>,
    root: HostId,
    previous: Option<TreeSource>,
) -> Vec<Content> {
    match previous {
        Some(TreeSource::Tree(tree)) => tree,
        Some(TreeSource::Serialized(json)) => match serial::parse_tree(&json) {
            Ok(tree) => tree,
            Err(err) => {
                log::warn!("malformed serialized tree, deriving from live host: {err}");
                host::derive_children(&*host.borrow(), root)
            }
        },
        None => host::derive_children(&*host.borrow(), root),
    }
}

fn run_pass<H: Host + ?Sized>(
    host: &mut H,
    root: HostId,
    render: &dyn Fn(&Store) -> Vec<Content>,
    store: &Store,
    prev: &mut Vec<Content>,
    memo: &mut MemoTable,
    ctx: &PatchCtx,
) -> Result<(), HostError> {
    let mut next = render(store);
    let result = reconcile_children(host, root, &mut next, prev, memo, ctx);
    *prev = next;
    memo.swap();
    result
}
