//! Branching undo/redo history.
//!
//! Revisions form a DAG held in a flat vector: every [`Revision`] stores
//! its parent index, its most recent child, the forward transaction and the
//! pre-computed inverse. The `current` index (with `-1` for the pre-root
//! empty state) identifies the effective document state; committing under a
//! non-tip `current` starts a sibling branch instead of discarding the old
//! future, and `redo` follows the most recently created child.
//!
//! A history is shared mutable state: reads take a shared lock, writes an
//! exclusive lock, and no I/O happens under either. Hook listeners run
//! outside the state lock and must not call back into the same history.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::change::{ChangeSet, Transaction};
use crate::error::{Error, Result};
use crate::rope::Rope;

/// Default cap on stored revisions before pruning kicks in.
pub const DEFAULT_MAX_REVISIONS: usize = 1000;

/// A node in the revision DAG.
#[derive(Debug, Clone)]
pub struct Revision {
    parent: isize,
    last_child: isize,
    forward: Transaction,
    inverse: Transaction,
    timestamp: u64,
}

impl Revision {
    /// Index of the parent revision; `-1` for children of the root state.
    pub fn parent(&self) -> isize {
        self.parent
    }

    /// Index of the most recently created child; `-1` when none.
    pub fn last_child(&self) -> isize {
        self.last_child
    }

    /// The transaction that produced this revision.
    pub fn forward(&self) -> &Transaction {
        &self.forward
    }

    /// The transaction that undoes this revision.
    pub fn inverse(&self) -> &Transaction {
        &self.inverse
    }

    /// Monotonic stamp of the forward transaction.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// The nine points where listeners can observe a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before a commit is attempted.
    PreCommit,
    /// After a revision was appended.
    PostCommit,
    /// Before an undo is attempted.
    PreUndo,
    /// After an undo stepped to the parent.
    PostUndo,
    /// Before a redo is attempted.
    PreRedo,
    /// After a redo advanced to a child.
    PostRedo,
    /// After pruning dropped old revisions.
    Prune,
    /// A savepoint was created against this history.
    SavepointCreated,
    /// A savepoint was restored against this history.
    SavepointRestored,
}

impl HookPoint {
    const COUNT: usize = 9;

    fn index(self) -> usize {
        match self {
            HookPoint::PreCommit => 0,
            HookPoint::PostCommit => 1,
            HookPoint::PreUndo => 2,
            HookPoint::PostUndo => 3,
            HookPoint::PreRedo => 4,
            HookPoint::PostRedo => 5,
            HookPoint::Prune => 6,
            HookPoint::SavepointCreated => 7,
            HookPoint::SavepointRestored => 8,
        }
    }
}

/// What a listener sees when its hook point fires.
#[derive(Debug)]
pub struct HookContext<'a> {
    /// The point that fired.
    pub point: HookPoint,
    /// The `current` index at firing time.
    pub revision: isize,
    /// The transaction involved, when the point has one.
    pub transaction: Option<&'a Transaction>,
    /// Number of revisions dropped; non-zero only for [`HookPoint::Prune`].
    pub pruned: usize,
}

/// A hook listener.
pub type HookFn = Box<dyn Fn(&HookContext<'_>) + Send + Sync>;

struct Listener {
    priority: i32,
    callback: HookFn,
}

struct HistoryState {
    revisions: Vec<Revision>,
    current: isize,
    max_size: usize,
}

/// Counters accumulated by the built-in metrics hook.
#[derive(Debug, Default)]
pub struct HistoryMetrics {
    commits: AtomicU64,
    undos: AtomicU64,
    redos: AtomicU64,
    prunes: AtomicU64,
}

impl HistoryMetrics {
    /// `(commits, undos, redos, pruned revisions)` so far.
    pub fn snapshot(&self) -> (u64, u64, u64, u64) {
        (
            self.commits.load(Ordering::Relaxed),
            self.undos.load(Ordering::Relaxed),
            self.redos.load(Ordering::Relaxed),
            self.prunes.load(Ordering::Relaxed),
        )
    }
}

/// Summary of a history's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
    /// Stored revision count.
    pub total_revisions: usize,
    /// The `current` index (`-1` = pre-root).
    pub current_index: isize,
    /// Configured revision cap.
    pub max_size: usize,
    /// Whether an undo is possible.
    pub can_undo: bool,
    /// Whether a redo is possible.
    pub can_redo: bool,
}

/// A branching revision history.
pub struct History {
    state: RwLock<HistoryState>,
    listeners: RwLock<[Vec<Listener>; HookPoint::COUNT]>,
}

impl History {
    /// An empty history with the default revision cap.
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_REVISIONS)
    }

    /// An empty history that prunes beyond `max_size` revisions
    /// (`0` disables pruning).
    pub fn with_max_size(max_size: usize) -> Self {
        History {
            state: RwLock::new(HistoryState {
                revisions: Vec::with_capacity(128),
                current: -1,
                max_size,
            }),
            listeners: RwLock::new(Default::default()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HistoryState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HistoryState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Registers a listener at `point`. Listeners run in ascending priority
    /// order; the listener list is built here so firing allocates nothing.
    pub fn register_hook(&self, point: HookPoint, priority: i32, callback: HookFn) {
        let mut listeners = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let slot = &mut listeners[point.index()];
        let at = slot
            .partition_point(|listener| listener.priority <= priority);
        slot.insert(at, Listener { priority, callback });
    }

    fn fire(&self, ctx: &HookContext<'_>) {
        let listeners = match self.listeners.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for listener in &listeners[ctx.point.index()] {
            (listener.callback)(ctx);
        }
    }

    /// Commits `transaction` as a child of the current revision.
    ///
    /// The inverse is derived from `pre_rope`, the document state *before*
    /// the transaction. Empty (identity) transactions are refused silently.
    pub fn commit(&self, transaction: Transaction, pre_rope: &Rope) -> Result<()> {
        if transaction.is_empty() {
            return Ok(());
        }
        self.fire(&HookContext {
            point: HookPoint::PreCommit,
            revision: self.current_index(),
            transaction: Some(&transaction),
            pruned: 0,
        });
        let inverse = transaction.invert(pre_rope)?;
        let timestamp = transaction.timestamp();
        let (new_index, pruned) = {
            let mut state = self.write();
            let revision = Revision {
                parent: state.current,
                last_child: -1,
                forward: transaction.clone(),
                inverse,
                timestamp,
            };
            state.revisions.push(revision);
            let new_index = (state.revisions.len() - 1) as isize;
            if state.current >= 0 {
                let parent = state.current as usize;
                state.revisions[parent].last_child = new_index;
            }
            state.current = new_index;
            let pruned = prune(&mut state);
            (state.current, pruned)
        };
        self.fire(&HookContext {
            point: HookPoint::PostCommit,
            revision: new_index,
            transaction: Some(&transaction),
            pruned: 0,
        });
        if pruned > 0 {
            self.fire(&HookContext {
                point: HookPoint::Prune,
                revision: new_index,
                transaction: None,
                pruned,
            });
        }
        Ok(())
    }

    /// Steps to the parent revision, returning the transaction that undoes
    /// the one just left. `None` at the root.
    pub fn undo(&self) -> Option<Transaction> {
        self.fire(&HookContext {
            point: HookPoint::PreUndo,
            revision: self.current_index(),
            transaction: None,
            pruned: 0,
        });
        let (inverse, revision) = {
            let mut state = self.write();
            if state.current < 0 {
                return None;
            }
            let index = state.current as usize;
            let inverse = state.revisions[index].inverse.clone();
            state.current = state.revisions[index].parent;
            (inverse, state.current)
        };
        self.fire(&HookContext {
            point: HookPoint::PostUndo,
            revision,
            transaction: Some(&inverse),
            pruned: 0,
        });
        Some(inverse)
    }

    /// Advances to the current revision's most recent child, returning its
    /// forward transaction. `None` at a tip.
    pub fn redo(&self) -> Option<Transaction> {
        self.fire(&HookContext {
            point: HookPoint::PreRedo,
            revision: self.current_index(),
            transaction: None,
            pruned: 0,
        });
        let (forward, revision) = {
            let mut state = self.write();
            let next = if state.current < 0 {
                // Pre-root state: redo re-enters the first revision.
                if state.revisions.is_empty() {
                    return None;
                }
                0
            } else {
                let last_child = state.revisions[state.current as usize].last_child;
                if last_child < 0 {
                    return None;
                }
                last_child as usize
            };
            state.current = next as isize;
            (state.revisions[next].forward.clone(), state.current)
        };
        self.fire(&HookContext {
            point: HookPoint::PostRedo,
            revision,
            transaction: Some(&forward),
            pruned: 0,
        });
        Some(forward)
    }

    /// Undoes up to `steps` revisions, returning them composed into one
    /// transaction. `None` when already at the root.
    pub fn earlier(&self, steps: usize) -> Result<Option<Transaction>> {
        let mut composed: Option<ChangeSet> = None;
        for _ in 0..steps {
            let Some(transaction) = self.undo() else {
                break;
            };
            composed = Some(match composed {
                None => transaction.change().clone(),
                Some(prior) => prior.compose(transaction.change())?,
            });
        }
        Ok(composed.map(Transaction::new))
    }

    /// Redoes up to `steps` revisions, composed into one transaction.
    /// `None` when already at a tip.
    pub fn later(&self, steps: usize) -> Result<Option<Transaction>> {
        let mut composed: Option<ChangeSet> = None;
        for _ in 0..steps {
            let Some(transaction) = self.redo() else {
                break;
            };
            composed = Some(match composed {
                None => transaction.change().clone(),
                Some(prior) => prior.compose(transaction.change())?,
            });
        }
        Ok(composed.map(Transaction::new))
    }

    /// Single-step variant of [`History::earlier`]; identical to
    /// [`History::undo`].
    pub fn earlier_step(&self) -> Option<Transaction> {
        self.undo()
    }

    /// Single-step variant of [`History::later`]; identical to
    /// [`History::redo`].
    pub fn later_step(&self) -> Option<Transaction> {
        self.redo()
    }

    /// Moves `current` to `target` (`-1` for the pre-root state), returning
    /// the composed transaction for the whole path: undos up to the lowest
    /// common ancestor, then redos down to the target.
    pub fn goto(&self, target: isize) -> Result<Option<Transaction>> {
        let mut state = self.write();
        let len = state.revisions.len() as isize;
        if target < -1 || target >= len {
            return Err(Error::OutOfBounds {
                op: "goto",
                position: target.max(0) as usize,
                min: 0,
                max: len as usize,
            });
        }
        if target == state.current {
            return Ok(None);
        }

        // Parents always precede children in the vector, so the LCA is
        // found by repeatedly lifting the larger index.
        let mut a = state.current;
        let mut b = target;
        while a != b {
            if a > b {
                a = state.revisions[a as usize].parent;
            } else {
                b = state.revisions[b as usize].parent;
            }
        }
        let lca = a;

        let mut changes: Vec<ChangeSet> = Vec::new();
        let mut cursor = state.current;
        while cursor != lca {
            let revision = &state.revisions[cursor as usize];
            changes.push(revision.inverse.change().clone());
            cursor = revision.parent;
        }
        let mut forward_path: Vec<ChangeSet> = Vec::new();
        let mut cursor = target;
        while cursor != lca {
            let revision = &state.revisions[cursor as usize];
            forward_path.push(revision.forward.change().clone());
            cursor = revision.parent;
        }
        changes.extend(forward_path.into_iter().rev());
        state.current = target;
        drop(state);

        let mut iter = changes.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut composed = first;
        for change in iter {
            composed = composed.compose(&change)?;
        }
        Ok(Some(Transaction::new(composed)))
    }

    /// Repositions `current` without emitting a transaction; the next
    /// commit starts a sibling chain under `revision`.
    pub fn branch(&self, revision: isize) -> Result<()> {
        let mut state = self.write();
        let len = state.revisions.len() as isize;
        if revision < -1 || revision >= len {
            return Err(Error::OutOfBounds {
                op: "branch",
                position: revision.max(0) as usize,
                min: 0,
                max: len as usize,
            });
        }
        state.current = revision;
        Ok(())
    }

    /// Returns `true` if an undo is possible.
    pub fn can_undo(&self) -> bool {
        self.read().current >= 0
    }

    /// Returns `true` if a redo is possible.
    pub fn can_redo(&self) -> bool {
        let state = self.read();
        if state.current < 0 {
            return !state.revisions.is_empty();
        }
        state.revisions[state.current as usize].last_child >= 0
    }

    /// The `current` index (`-1` = pre-root).
    pub fn current_index(&self) -> isize {
        self.read().current
    }

    /// Number of stored revisions.
    pub fn revision_count(&self) -> usize {
        self.read().revisions.len()
    }

    /// A copy of the revision at `index`.
    pub fn revision(&self, index: usize) -> Option<Revision> {
        self.read().revisions.get(index).cloned()
    }

    /// Returns `true` when `current` is the pre-root state.
    pub fn at_root(&self) -> bool {
        self.read().current < 0
    }

    /// Returns `true` when the current revision has no children.
    pub fn at_tip(&self) -> bool {
        let state = self.read();
        if state.current < 0 {
            return state.revisions.is_empty();
        }
        state.revisions[state.current as usize].last_child < 0
    }

    /// Revision indices from the oldest ancestor to `current`.
    pub fn path_from_root(&self) -> Vec<usize> {
        let state = self.read();
        let mut path = Vec::new();
        let mut cursor = state.current;
        while cursor >= 0 {
            path.push(cursor as usize);
            cursor = state.revisions[cursor as usize].parent;
        }
        path.reverse();
        path
    }

    /// The configured revision cap.
    pub fn max_size(&self) -> usize {
        self.read().max_size
    }

    /// Reconfigures the revision cap and prunes immediately if needed.
    pub fn set_max_size(&self, max_size: usize) {
        let (revision, pruned) = {
            let mut state = self.write();
            state.max_size = max_size;
            (state.current, prune(&mut state))
        };
        if pruned > 0 {
            self.fire(&HookContext {
                point: HookPoint::Prune,
                revision,
                transaction: None,
                pruned,
            });
        }
    }

    /// Drops every revision, returning to the pre-root state.
    pub fn clear(&self) {
        let mut state = self.write();
        state.revisions.clear();
        state.current = -1;
    }

    /// Shape summary.
    pub fn stats(&self) -> HistoryStats {
        let state = self.read();
        let can_redo = if state.current < 0 {
            !state.revisions.is_empty()
        } else {
            state.revisions[state.current as usize].last_child >= 0
        };
        HistoryStats {
            total_revisions: state.revisions.len(),
            current_index: state.current,
            max_size: state.max_size,
            can_undo: state.current >= 0,
            can_redo,
        }
    }

    /// Fires the savepoint-created hook point.
    pub fn notify_savepoint_created(&self) {
        self.fire(&HookContext {
            point: HookPoint::SavepointCreated,
            revision: self.current_index(),
            transaction: None,
            pruned: 0,
        });
    }

    /// Fires the savepoint-restored hook point.
    pub fn notify_savepoint_restored(&self) {
        self.fire(&HookContext {
            point: HookPoint::SavepointRestored,
            revision: self.current_index(),
            transaction: None,
            pruned: 0,
        });
    }
}

impl Default for History {
    fn default() -> Self {
        History::new()
    }
}

/// Drops the oldest prefix beyond the cap and rebases every surviving
/// index. Returns the number of dropped revisions.
fn prune(state: &mut HistoryState) -> usize {
    if state.max_size == 0 || state.revisions.len() <= state.max_size {
        return 0;
    }
    let excess = state.revisions.len() - state.max_size;
    state.revisions.drain(..excess);
    let shift = excess as isize;
    for revision in &mut state.revisions {
        revision.parent = if revision.parent < shift {
            -1
        } else {
            revision.parent - shift
        };
        if revision.last_child >= 0 {
            revision.last_child -= shift;
        }
    }
    state.current = (state.current - shift).max(-1);
    excess
}

// ========== Built-in hooks ==========
//
// Four built-ins ship with the history: the size limiter (the pruning
// mechanism configured through `max_size`, which reports every trim
// through `HookPoint::Prune`), plus the three listener constructors below.

/// A hook that emits a `tracing` debug event for every firing.
pub fn logger_hook() -> HookFn {
    Box::new(|ctx| {
        tracing::debug!(
            point = ?ctx.point,
            revision = ctx.revision,
            pruned = ctx.pruned,
            "history event"
        );
    })
}

/// A hook that checks the transaction attached to a firing for internal
/// consistency (fused op stream) and emits a `tracing` warning otherwise.
pub fn validator_hook() -> HookFn {
    use crate::change::Op;
    Box::new(|ctx| {
        let Some(transaction) = ctx.transaction else {
            return;
        };
        let ops = transaction.change().ops();
        let fused = ops.windows(2).all(|pair| {
            !matches!(
                (&pair[0], &pair[1]),
                (Op::Retain(_), Op::Retain(_))
                    | (Op::Delete(_), Op::Delete(_))
                    | (Op::Insert(_), Op::Insert(_))
            )
        });
        if !fused {
            tracing::warn!(
                point = ?ctx.point,
                revision = ctx.revision,
                "transaction op stream is not fused"
            );
        }
    })
}

/// A hook that accumulates counters into `metrics`. Register it at
/// [`HookPoint::PostCommit`], [`HookPoint::PostUndo`],
/// [`HookPoint::PostRedo`] and [`HookPoint::Prune`].
pub fn metrics_hook(metrics: std::sync::Arc<HistoryMetrics>) -> HookFn {
    Box::new(move |ctx| {
        match ctx.point {
            HookPoint::PostCommit => metrics.commits.fetch_add(1, Ordering::Relaxed),
            HookPoint::PostUndo => metrics.undos.fetch_add(1, Ordering::Relaxed),
            HookPoint::PostRedo => metrics.redos.fetch_add(1, Ordering::Relaxed),
            HookPoint::Prune => metrics.prunes.fetch_add(ctx.pruned as u64, Ordering::Relaxed),
            _ => 0,
        };
    })
}
