#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use fritz2_core::{Source, Subscription};

use super::{Disposable, MountOptions, MountScope, MountState, check_attach};
use crate::config::RenderErrorPolicy;
use crate::error::{MountError, RenderError};
use crate::target::ContentTarget;

type Render<T, C> = Box<dyn Fn(&T, &mut MountScope) -> Result<C, RenderError>>;

struct SingleCore<T, G: ContentTarget> {
    state: Cell<MountState>,
    target: RefCell<G>,
    render: Render<T, G::Content>,
    options: MountOptions,
    scope: RefCell<MountScope>,
    pending: RefCell<VecDeque<T>>,
    rendering: Cell<bool>,
    last: RefCell<Option<T>>,
    renders: Cell<u64>,
    errors: Cell<u64>,
    upstream: RefCell<Option<Subscription>>,
}

/// Replaces a target's content on every upstream emission.
pub struct SingleMount<T, G: ContentTarget> {
    core: Rc<SingleCore<T, G>>,
}

impl<T, G: ContentTarget> Clone for SingleMount<T, G> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: fmt::Debug, G: ContentTarget> fmt::Debug for SingleMount<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleMount")
            .field("state", &self.core.state.get())
            .field("last", &*self.core.last.borrow())
            .field("renders", &self.core.renders.get())
            .field("errors", &self.core.errors.get())
            .finish()
    }
}

impl<T, G> SingleMount<T, G>
where
    T: Clone + 'static,
    G: ContentTarget + 'static,
{
    /// An unbound mount; nothing renders until [`attach`](Self::attach).
    pub fn new(
        target: G,
        options: MountOptions,
        render: impl Fn(&T, &mut MountScope) -> Result<G::Content, RenderError> + 'static,
    ) -> Self {
        Self {
            core: Rc::new(SingleCore {
                state: Cell::new(MountState::Unbound),
                target: RefCell::new(target),
                render: Box::new(render),
                options,
                scope: RefCell::new(MountScope::new()),
                pending: RefCell::new(VecDeque::new()),
                rendering: Cell::new(false),
                last: RefCell::new(None),
                renders: Cell::new(0),
                errors: Cell::new(0),
                upstream: RefCell::new(None),
            }),
        }
    }

    /// Subscribe to `source`, rendering its current value immediately.
    pub fn attach(&self, source: &impl Source<T>) -> Result<(), MountError> {
        check_attach(self.core.state.get())?;
        self.bind_to(source);
        Ok(())
    }

    pub(crate) fn bind_to(&self, source: &impl Source<T>) {
        self.core.state.set(MountState::Bound);
        let weak = Rc::downgrade(&self.core);
        let sub = source.subscribe_boxed(Box::new(move |value: &T| {
            if let Some(core) = weak.upgrade() {
                core.push(value.clone());
            }
        }));
        if self.core.state.get() == MountState::Disposed {
            sub.cancel();
        } else {
            *self.core.upstream.borrow_mut() = Some(sub);
        }
    }

    #[must_use]
    pub fn state(&self) -> MountState {
        self.core.state.get()
    }

    /// The value behind the content currently shown.
    #[must_use]
    pub fn last_value(&self) -> Option<T> {
        self.core.last.borrow().clone()
    }

    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.core.renders.get()
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.core.errors.get()
    }

    /// Bindings held by the currently rendered content.
    #[must_use]
    pub fn scope_bindings(&self) -> usize {
        self.core.scope.borrow().binding_count()
    }

    pub fn with_target<R>(&self, f: impl FnOnce(&G) -> R) -> R {
        f(&*self.core.target.borrow())
    }

    /// Stop rendering and release the content's bindings. The rendered
    /// content itself stays on the target.
    pub fn dispose(&self) -> Result<(), MountError> {
        if self.core.state.replace(MountState::Disposed) == MountState::Disposed {
            return Err(MountError::Disposed);
        }
        if let Some(sub) = self.core.upstream.borrow_mut().take() {
            sub.cancel();
        }
        self.core.pending.borrow_mut().clear();
        let scope = self.core.scope.replace(MountScope::new());
        drop(scope);
        tracing::debug!(renders = self.core.renders.get(), "single mount disposed");
        Ok(())
    }
}

impl<T: Clone + 'static, G: ContentTarget + 'static> SingleCore<T, G> {
    fn push(&self, value: T) {
        if self.state.get() == MountState::Disposed {
            return;
        }
        self.pending.borrow_mut().push_back(value);
        if self.rendering.replace(true) {
            return;
        }
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(value) = next else { break };
            if self.state.get() == MountState::Disposed {
                self.pending.borrow_mut().clear();
                break;
            }
            self.render_one(value);
        }
        self.rendering.set(false);
    }

    fn render_one(&self, value: T) {
        let _span = tracing::debug_span!("mount.render", mount = "single").entered();
        let mut scope = MountScope::new();
        let outcome = (self.render)(&value, &mut scope)
            .and_then(|content| self.target.borrow_mut().replace_content(content));
        match outcome {
            Ok(()) => {
                let previous = self.scope.replace(scope);
                drop(previous);
                *self.last.borrow_mut() = Some(value);
                self.renders.set(self.renders.get() + 1);
            }
            Err(err) => {
                self.errors.set(self.errors.get() + 1);
                self.options.report("single", &err);
                if self.options.effective_policy() == RenderErrorPolicy::ClearAndContinue {
                    self.target.borrow_mut().clear_content();
                    let previous = self.scope.replace(MountScope::new());
                    drop(previous);
                    *self.last.borrow_mut() = None;
                }
            }
        }
    }
}

impl<T: Clone + 'static, G: ContentTarget + 'static> Disposable for SingleMount<T, G> {
    fn dispose(&self) -> Result<(), MountError> {
        SingleMount::dispose(self)
    }

    fn is_disposed(&self) -> bool {
        self.state() == MountState::Disposed
    }
}
