#![forbid(unsafe_code)]

//! Mount points: where reactive values meet a rendering target.
//!
//! - [`SingleMount`]: re-renders the whole content on every emission.
//! - [`MultiMount`]: mirrors a keyed list as children, applying patch batches
//!   and routing value-only changes to per-item flows.
//! - [`MountScope`]: what a rendered fragment subscribed to, released when the
//!   fragment goes away.
//!
//! # Lifecycle
//!
//! ```text
//! Unbound --attach--> Bound --dispose--> Disposed
//!    \____________________dispose______/
//! ```
//!
//! Attaching renders the current upstream value immediately. `Disposed` is
//! terminal; a second `dispose()` fails with [`MountError::Disposed`].
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Render fails | Logged at `warn`, counted, `on_error` hook, previous content kept |
//! | Render fails, `ClearAndContinue` | As above, then the target is cleared |
//! | Upstream list has duplicate ids | Reported as [`RenderError::Diff`], children untouched |
//! | Emission during a render | Queued, rendered after the current one |

mod multi;
mod scope;
mod single;

pub use multi::MultiMount;
pub use scope::{Disposable, MountScope};
pub use single::SingleMount;

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use fritz2_core::{Flow, Source};

use crate::config::RenderErrorPolicy;
use crate::error::{MountError, RenderError};
use crate::target::{ChildTarget, ContentTarget};

/// Lifecycle state of a mount point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountState {
    Unbound,
    Bound,
    Disposed,
}

/// Per-mount error handling.
#[derive(Clone, Default)]
pub struct MountOptions {
    pub policy: RenderErrorPolicy,
    pub on_error: Option<Rc<dyn Fn(&RenderError)>>,
    live_policy: Option<Flow<RenderErrorPolicy>>,
}

impl fmt::Debug for MountOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountOptions")
            .field("policy", &self.policy)
            .field("on_error", &self.on_error.is_some())
            .field("live_policy", &self.live_policy.is_some())
            .finish()
    }
}

impl MountOptions {
    #[must_use]
    pub fn with_policy(mut self, policy: RenderErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Read the policy from `policy` on every failure instead of fixing it
    /// at bind time. Overrides [`with_policy`](Self::with_policy).
    #[must_use]
    pub fn follow_policy(mut self, policy: Flow<RenderErrorPolicy>) -> Self {
        self.live_policy = Some(policy);
        self
    }

    /// The policy in force right now.
    #[must_use]
    pub fn effective_policy(&self) -> RenderErrorPolicy {
        self.live_policy.as_ref().map_or(self.policy, Flow::get)
    }

    #[must_use]
    pub fn on_error(mut self, hook: impl Fn(&RenderError) + 'static) -> Self {
        self.on_error = Some(Rc::new(hook));
        self
    }

    pub(crate) fn report(&self, kind: &'static str, err: &RenderError) {
        tracing::warn!(mount = kind, error = %err, "render failed");
        if let Some(hook) = &self.on_error {
            hook(err);
        }
    }
}

/// Render every value of `source` into `target`, replacing its content.
pub fn bind_single<T, G>(
    source: &impl Source<T>,
    target: G,
    render: impl Fn(&T, &mut MountScope) -> Result<G::Content, RenderError> + 'static,
) -> SingleMount<T, G>
where
    T: Clone + 'static,
    G: ContentTarget + 'static,
{
    bind_single_with(source, target, MountOptions::default(), render)
}

pub fn bind_single_with<T, G>(
    source: &impl Source<T>,
    target: G,
    options: MountOptions,
    render: impl Fn(&T, &mut MountScope) -> Result<G::Content, RenderError> + 'static,
) -> SingleMount<T, G>
where
    T: Clone + 'static,
    G: ContentTarget + 'static,
{
    let mount = SingleMount::new(target, options, render);
    mount.bind_to(source);
    mount
}

/// Mirror the list emitted by `source` as children of `target`, one per id.
///
/// `render` runs once per inserted item and receives that item's flow, which
/// emits value changes for the same id without structural patches.
pub fn bind_list<T, K, G>(
    source: &impl Source<Vec<T>>,
    id: impl Fn(&T) -> K + 'static,
    target: G,
    render: impl Fn(&Flow<T>, &mut MountScope) -> Result<G::Child, RenderError> + 'static,
) -> MultiMount<T, K, G>
where
    T: Clone + PartialEq + 'static,
    K: Hash + Eq + Clone + fmt::Debug + 'static,
    G: ChildTarget + 'static,
{
    bind_list_with(source, id, target, MountOptions::default(), render)
}

pub fn bind_list_with<T, K, G>(
    source: &impl Source<Vec<T>>,
    id: impl Fn(&T) -> K + 'static,
    target: G,
    options: MountOptions,
    render: impl Fn(&Flow<T>, &mut MountScope) -> Result<G::Child, RenderError> + 'static,
) -> MultiMount<T, K, G>
where
    T: Clone + PartialEq + 'static,
    K: Hash + Eq + Clone + fmt::Debug + 'static,
    G: ChildTarget + 'static,
{
    let mount = MultiMount::new(id, target, options, render);
    mount.bind_to(source);
    mount
}

pub(crate) fn check_attach(state: MountState) -> Result<(), MountError> {
    match state {
        MountState::Unbound => Ok(()),
        MountState::Bound => Err(MountError::AlreadyBound),
        MountState::Disposed => Err(MountError::Disposed),
    }
}
