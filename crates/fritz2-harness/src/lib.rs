#![forbid(unsafe_code)]

//! Test harness for fritz2.
//!
//! - [`RecordingTarget`]: an in-memory rendering target implementing both
//!   [`ContentTarget`] and [`ChildTarget`], logging every operation and able
//!   to refuse the next one on demand.
//! - [`Recorder`]: collects everything a [`Source`] emits.
//! - [`yield_now`]: suspends an async reducer for one executor turn.
//! - [`strategies`]: proptest strategies for keyed lists.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use fritz2_core::{Source, Subscription};
use fritz2_runtime::{ChildTarget, ContentTarget, RenderError};

/// One call a mount point made on a [`RecordingTarget`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetOp<C> {
    Replace(C),
    Clear,
    Insert { index: usize, child: C },
    Remove { index: usize },
    Move { from: usize, to: usize },
}

struct Recording<C> {
    content: Option<C>,
    children: Vec<C>,
    ops: Vec<TargetOp<C>>,
    refuse_next: Option<&'static str>,
}

/// Shared in-memory target. Clones observe the same recording, so a test
/// keeps one handle while the mount point owns another.
pub struct RecordingTarget<C> {
    state: Rc<RefCell<Recording<C>>>,
}

impl<C> Clone for RecordingTarget<C> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<C> Default for RecordingTarget<C> {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(Recording {
                content: None,
                children: Vec::new(),
                ops: Vec::new(),
                refuse_next: None,
            })),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for RecordingTarget<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("RecordingTarget")
            .field("content", &state.content)
            .field("children", &state.children)
            .field("ops", &state.ops.len())
            .finish()
    }
}

impl<C: Clone> RecordingTarget<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn content(&self) -> Option<C> {
        self.state.borrow().content.clone()
    }

    #[must_use]
    pub fn children(&self) -> Vec<C> {
        self.state.borrow().children.clone()
    }

    #[must_use]
    pub fn ops(&self) -> Vec<TargetOp<C>> {
        self.state.borrow().ops.clone()
    }

    /// Return and forget the operation log.
    pub fn take_ops(&self) -> Vec<TargetOp<C>> {
        std::mem::take(&mut self.state.borrow_mut().ops)
    }

    /// Make the next operation named `op` (`"replace"`, `"insert"`,
    /// `"remove"`, `"move"`) fail with [`RenderError::Target`].
    pub fn refuse_next(&self, op: &'static str) {
        self.state.borrow_mut().refuse_next = Some(op);
    }

    /// Drop a pending [`refuse_next`](Self::refuse_next) that has not fired.
    pub fn clear_refusal(&self) {
        self.state.borrow_mut().refuse_next = None;
    }

    fn gate(&self, op: &'static str, index: usize, len: usize) -> Result<(), RenderError> {
        let mut state = self.state.borrow_mut();
        if state.refuse_next == Some(op) {
            state.refuse_next = None;
            tracing::debug!(op, index, "recording target refused operation");
            return Err(RenderError::Target { op, index, len });
        }
        Ok(())
    }
}

impl<C: Clone> ContentTarget for RecordingTarget<C> {
    type Content = C;

    fn replace_content(&mut self, content: C) -> Result<(), RenderError> {
        self.gate("replace", 0, 1)?;
        let mut state = self.state.borrow_mut();
        state.ops.push(TargetOp::Replace(content.clone()));
        state.content = Some(content);
        Ok(())
    }

    fn clear_content(&mut self) {
        let mut state = self.state.borrow_mut();
        state.ops.push(TargetOp::Clear);
        state.content = None;
    }
}

impl<C: Clone> ChildTarget for RecordingTarget<C> {
    type Child = C;

    fn insert_child(&mut self, index: usize, child: C) -> Result<(), RenderError> {
        let len = self.child_count();
        self.gate("insert", index, len)?;
        if index > len {
            return Err(RenderError::Target {
                op: "insert",
                index,
                len,
            });
        }
        let mut state = self.state.borrow_mut();
        state.ops.push(TargetOp::Insert {
            index,
            child: child.clone(),
        });
        state.children.insert(index, child);
        Ok(())
    }

    fn remove_child(&mut self, index: usize) -> Result<C, RenderError> {
        let len = self.child_count();
        self.gate("remove", index, len)?;
        if index >= len {
            return Err(RenderError::Target {
                op: "remove",
                index,
                len,
            });
        }
        let mut state = self.state.borrow_mut();
        state.ops.push(TargetOp::Remove { index });
        Ok(state.children.remove(index))
    }

    fn move_child(&mut self, from: usize, to: usize) -> Result<(), RenderError> {
        let len = self.child_count();
        self.gate("move", from, len)?;
        if from >= len || to >= len {
            return Err(RenderError::Target {
                op: "move",
                index: from.max(to),
                len,
            });
        }
        let mut state = self.state.borrow_mut();
        state.ops.push(TargetOp::Move { from, to });
        let child = state.children.remove(from);
        state.children.insert(to, child);
        Ok(())
    }

    fn child_count(&self) -> usize {
        self.state.borrow().children.len()
    }
}

/// Collects every value a source emits while the recorder is alive.
pub struct Recorder<T> {
    values: Rc<RefCell<Vec<T>>>,
    _subscription: Subscription,
}

impl<T: Clone + 'static> Recorder<T> {
    pub fn attach(source: &impl Source<T>) -> Self {
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&values);
        let subscription = source.observe(move |value: &T| sink.borrow_mut().push(value.clone()));
        Self {
            values,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.values.borrow().clone()
    }

    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.values.borrow_mut())
    }
}

/// Suspend once, waking immediately, so other tasks on a local pool get a
/// turn before the caller resumes.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

pub mod strategies {
    //! Proptest strategies for keyed list tests.

    use proptest::prelude::*;

    /// Duplicate-free id sequences drawn from `0..pool`, in random order.
    pub fn unique_keys(pool: u8, max_len: usize) -> impl Strategy<Value = Vec<u8>> {
        let universe: Vec<u8> = (0..pool).collect();
        let max_len = max_len.min(universe.len());
        proptest::sample::subsequence(universe, 0..=max_len).prop_shuffle()
    }

    /// Keyed items `(id, payload)` with unique ids and arbitrary payloads.
    pub fn keyed_items(pool: u8, max_len: usize) -> impl Strategy<Value = Vec<(u8, u8)>> {
        unique_keys(pool, max_len).prop_flat_map(|keys| {
            let len = keys.len();
            (Just(keys), proptest::collection::vec(0u8..4, len))
                .prop_map(|(keys, payloads)| keys.into_iter().zip(payloads).collect())
        })
    }
}
