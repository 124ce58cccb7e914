//! Animation contexts: the scoped create/revert lifecycle for one subtree.
//!
//! A context is created pending; its build closure runs once the settle delay
//! elapses and receives a [`Scope`] restricted to the context root. Reverting
//! cancels a pending build, unregisters the context's triggers, kills its free
//! tweens and restores every property it wrote. Revert is idempotent.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::StackConfig;
use crate::document::{Host, Selector};
use crate::error::RevealError;
use crate::ids::{ContainerId, ContextId, ElementId, IdAllocator, TimerId, TriggerId, TweenId};
use crate::tween::{Property, Sample, Timeline, Tween, TweenSpec};
use crate::trigger::{TriggerRegistry, TriggerSpec};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextState {
    /// Waiting for the settle delay.
    Pending,
    /// Build ran; triggers are live.
    Active,
    /// Root was gone when the build came due; nothing registered.
    Skipped,
    Reverted,
}

/// Closure that registers a context's animations.
pub type BuildFn = Box<dyn FnOnce(&mut Scope<'_>) -> Result<(), RevealError>>;

pub struct AnimationContext {
    id: ContextId,
    container: Option<ContainerId>,
    root: ElementId,
    state: ContextState,
    pending_timer: Option<TimerId>,
    build: Option<BuildFn>,
    triggers: Vec<TriggerId>,
    tweens: Vec<TweenId>,
    touched: Vec<(ElementId, Property)>,
}

impl fmt::Debug for AnimationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationContext")
            .field("id", &self.id)
            .field("container", &self.container)
            .field("root", &self.root)
            .field("state", &self.state)
            .field("pending_timer", &self.pending_timer)
            .field("triggers", &self.triggers)
            .field("tweens", &self.tweens)
            .finish()
    }
}

impl AnimationContext {
    pub fn new(
        id: ContextId,
        container: Option<ContainerId>,
        root: ElementId,
        timer: TimerId,
        build: BuildFn,
    ) -> Self {
        Self {
            id,
            container,
            root,
            state: ContextState::Pending,
            pending_timer: Some(timer),
            build: Some(build),
            triggers: Vec::new(),
            tweens: Vec::new(),
            touched: Vec::new(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn container(&self) -> Option<ContainerId> {
        self.container
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending_timer
    }

    pub fn triggers(&self) -> &[TriggerId] {
        &self.triggers
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, ContextState::Pending | ContextState::Active)
    }

    /// Take the build closure for the due timer. `None` once taken or reverted.
    pub fn take_build(&mut self) -> Option<BuildFn> {
        self.pending_timer = None;
        if self.state != ContextState::Pending {
            return None;
        }
        self.build.take()
    }

    pub fn mark_skipped(&mut self) {
        self.state = ContextState::Skipped;
    }

    pub fn mark_active(&mut self) {
        self.state = ContextState::Active;
    }

    /// Flip to reverted and hand back what the caller must tear down.
    /// The second call returns `None`.
    pub fn begin_revert(&mut self) -> Option<RevertPlan> {
        if self.state == ContextState::Reverted {
            return None;
        }
        self.state = ContextState::Reverted;
        self.build = None;
        Some(RevertPlan {
            timer: self.pending_timer.take(),
            tweens: std::mem::take(&mut self.tweens),
            touched: std::mem::take(&mut self.touched),
            triggers: std::mem::take(&mut self.triggers).len(),
        })
    }
}

/// Resources released by one revert.
#[derive(Debug)]
pub struct RevertPlan {
    pub timer: Option<TimerId>,
    pub tweens: Vec<TweenId>,
    pub touched: Vec<(ElementId, Property)>,
    pub triggers: usize,
}

/// Time-based tweens not bound to scroll (e.g. a fade on carousel navigation).
#[derive(Debug, Default)]
pub struct FreeTweens {
    ids: IdAllocator,
    running: IndexMap<TweenId, (ContextId, Timeline)>,
}

impl FreeTweens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Start a tween, overwriting any tween of the same context still running on
    /// one of its targets.
    fn start(&mut self, context: ContextId, tween: Tween, samples: &mut Vec<Sample>) -> TweenId {
        self.running.retain(|_, (owner, tl)| {
            *owner != context
                || !tl
                    .tweens()
                    .iter()
                    .any(|t| t.targets.iter().any(|el| tween.targets.contains(el)))
        });
        let id = self.ids.alloc_tween();
        let mut timeline = Timeline::new(vec![tween]);
        timeline.sample_into(samples);
        timeline.play();
        self.running.insert(id, (context, timeline));
        id
    }

    /// Kill a tween where it stands. Returns the properties it wrote.
    pub fn kill(&mut self, id: TweenId) -> Vec<(ElementId, Property)> {
        self.running
            .shift_remove(&id)
            .map(|(_, tl)| tl.touched().collect())
            .unwrap_or_default()
    }

    /// Advance every running tween; finished ones are dropped after their final sample.
    pub fn update(&mut self, dt: f32, samples: &mut Vec<Sample>) {
        self.running.retain(|_, (_, tl)| {
            let running = tl.advance(dt);
            tl.sample_into(samples);
            running
        });
    }
}

/// Registration surface handed to a context's build closure. Every query and
/// registration is restricted to descendants of the context root.
pub struct Scope<'a> {
    pub(crate) context: &'a mut AnimationContext,
    pub(crate) host: &'a dyn Host,
    pub(crate) registry: &'a mut TriggerRegistry,
    pub(crate) free: &'a mut FreeTweens,
    pub(crate) samples: &'a mut Vec<Sample>,
    pub(crate) viewport_height: f32,
    pub(crate) stack: StackConfig,
}

impl<'a> Scope<'a> {
    pub fn root(&self) -> ElementId {
        self.context.root
    }

    pub fn context_id(&self) -> ContextId {
        self.context.id
    }

    pub fn stack(&self) -> &StackConfig {
        &self.stack
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    /// Query descendants of the root.
    pub fn query(&self, selector: &str) -> Result<Vec<ElementId>, RevealError> {
        let sel: Selector = selector.parse()?;
        Ok(self.host.query(self.context.root, &sel))
    }

    /// Query descendants of `within`, which must itself be inside the root.
    pub fn query_in(&self, within: ElementId, selector: &str) -> Result<Vec<ElementId>, RevealError> {
        if !self.host.contains(self.context.root, within) {
            return Ok(Vec::new());
        }
        let sel: Selector = selector.parse()?;
        Ok(self.host.query(within, &sel))
    }

    fn in_scope(&self, el: ElementId) -> bool {
        self.host.is_attached(el) && self.host.contains(self.context.root, el)
    }

    /// Set a property immediately. It is restored when the context reverts.
    pub fn set(&mut self, targets: &[ElementId], property: Property, value: f32) {
        for &target in targets {
            if !self.in_scope(target) {
                continue;
            }
            self.samples.push(Sample {
                target,
                property,
                value,
            });
            if !self.context.touched.contains(&(target, property)) {
                self.context.touched.push((target, property));
            }
        }
    }

    /// Register a scroll trigger. Targets outside the root are dropped; if the
    /// anchor is missing the trigger is skipped and `Ok(None)` returned.
    pub fn register(&mut self, mut spec: TriggerSpec) -> Result<Option<TriggerId>, RevealError> {
        if !self.in_scope(spec.anchor) {
            log::debug!(
                "{:?}: anchor {:?} not in scope; skipping trigger",
                self.context.id,
                spec.anchor
            );
            return Ok(None);
        }
        if let Some(end) = spec.end_anchor {
            if !self.host.is_attached(end) {
                return Ok(None);
            }
        }
        let requested = spec.tweens.len();
        let host = self.host;
        let root = self.context.root;
        for tween in &mut spec.tweens {
            tween
                .targets
                .retain(|t| host.is_attached(*t) && host.contains(root, *t));
        }
        spec.tweens.retain(|t| !t.targets.is_empty());
        if requested > 0 && spec.tweens.is_empty() {
            log::debug!("{:?}: no tween targets in scope; skipping trigger", self.context.id);
            return Ok(None);
        }
        let id = self.registry.register(
            self.context.id,
            self.context.root,
            spec,
            self.host,
            self.viewport_height,
            self.samples,
        )?;
        if let Some(id) = id {
            self.context.triggers.push(id);
        }
        Ok(id)
    }

    /// Start a time-based tween right away (not scroll-bound).
    pub fn animate(&mut self, targets: Vec<ElementId>, spec: TweenSpec) -> Option<TweenId> {
        let targets: Vec<ElementId> = targets.into_iter().filter(|t| self.in_scope(*t)).collect();
        if targets.is_empty() {
            return None;
        }
        for &target in &targets {
            for range in &spec.props {
                if !self.context.touched.contains(&(target, range.property)) {
                    self.context.touched.push((target, range.property));
                }
            }
        }
        let id = self
            .free
            .start(self.context.id, Tween::new(targets, spec), self.samples);
        self.context.tweens.push(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> AnimationContext {
        AnimationContext::new(
            ContextId(0),
            None,
            ElementId(1),
            TimerId(7),
            Box::new(|_scope| Ok(())),
        )
    }

    #[test]
    fn revert_is_idempotent() {
        let mut c = ctx();
        let plan = c.begin_revert().unwrap();
        assert_eq!(plan.timer, Some(TimerId(7)));
        assert!(c.begin_revert().is_none());
        assert_eq!(c.state(), ContextState::Reverted);
        assert!(c.take_build().is_none());
    }

    #[test]
    fn build_is_taken_once() {
        let mut c = ctx();
        assert!(c.take_build().is_some());
        assert!(c.take_build().is_none());
        assert_eq!(c.pending_timer(), None);
    }
}
