//! The application root.
//!
//! [`Stage`] owns every stateful part of the orchestration layer: the timer
//! queue, breakpoint monitor, trigger registry, animation contexts, mounted
//! sections and the smooth-scroll slot. The host feeds it viewport, scroll and
//! a frame clock, and applies the [`Frame`] returned by [`Stage::tick`].
//!
//! Ordering guarantees:
//! - a container's previous context is reverted before its next one is created;
//! - a layout transition runs revert, rebuild, create, in that order, and at most
//!   once per settled resize;
//! - revert writes are delivered before any write produced afterwards.

use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::breakpoint::{BreakpointMonitor, BreakpointState, MatchChange, Viewport};
use crate::config::Config;
use crate::context::{AnimationContext, BuildFn, ContextState, FreeTweens, Scope};
use crate::document::Host;
use crate::error::RevealError;
use crate::ids::{ContainerId, ContextId, ElementId, IdAllocator, TimerId};
use crate::layout::{decide_mode, CarouselState, LayoutMode, LayoutSwitcher};
use crate::section::Section;
use crate::smooth::SmoothScrollHandle;
use crate::timer::TimerQueue;
use crate::trigger::{TriggerEvent, TriggerRegistry};
use crate::tween::{PropertyWrite, Sample, StyleCache};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Task {
    Build(ContextId),
    ResizeSettled,
}

/// Lifecycle and trigger notifications, in the order they happened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StageEvent {
    ContextBuilt {
        context: ContextId,
        root: ElementId,
        triggers: usize,
    },
    /// The root was gone when the settle delay elapsed.
    ContextSkipped {
        context: ContextId,
        root: ElementId,
    },
    ContextReverted {
        context: ContextId,
        root: ElementId,
    },
    Trigger {
        event: TriggerEvent,
    },
    LayoutChanged {
        container: ContainerId,
        from: LayoutMode,
        to: LayoutMode,
    },
    CarouselMoved {
        container: ContainerId,
        index: usize,
    },
    BreakpointChanged {
        state: BreakpointState,
    },
    /// A media-query subscription flipped.
    MediaChanged {
        change: MatchChange,
    },
}

/// Everything the host must apply for one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub epoch: u64,
    pub now_ms: f64,
    /// Seconds since the previous tick.
    pub dt: f32,
    /// Scroll offset triggers were evaluated against (virtual when smoothing).
    pub scroll: f32,
    pub writes: Vec<PropertyWrite>,
    pub events: Vec<StageEvent>,
}

struct Container {
    section: Rc<dyn Section>,
    root: ElementId,
    context: Option<ContextId>,
    layout: Option<LayoutSwitcher>,
}

pub struct Stage<H: Host> {
    cfg: Config,
    host: H,
    epoch: u64,
    now_ms: f64,
    last_tick_ms: Option<f64>,
    ids: IdAllocator,
    timers: TimerQueue<Task>,
    monitor: BreakpointMonitor,
    registry: TriggerRegistry,
    contexts: HashMap<ContextId, AnimationContext>,
    /// Latest context created per root element.
    by_root: HashMap<ElementId, ContextId>,
    containers: IndexMap<ContainerId, Container>,
    free: FreeTweens,
    styles: StyleCache,
    smooth: Option<SmoothScrollHandle>,
    native_scroll: f32,
    pending_resize: Option<TimerId>,
    samples: Vec<Sample>,
    pending_writes: Vec<PropertyWrite>,
    events: Vec<StageEvent>,
}

impl<H: Host> fmt::Debug for Stage<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("epoch", &self.epoch)
            .field("now_ms", &self.now_ms)
            .field("containers", &self.containers.len())
            .field("contexts", &self.contexts.len())
            .field("triggers", &self.registry.len())
            .field("timers", &self.timers.len())
            .field("smooth", &self.smooth.is_some())
            .finish()
    }
}

impl<H: Host> Stage<H> {
    pub fn new(cfg: Config, host: H, viewport: Viewport) -> Self {
        Self {
            cfg,
            host,
            epoch: 0,
            now_ms: 0.0,
            last_tick_ms: None,
            ids: IdAllocator::new(),
            timers: TimerQueue::new(),
            monitor: BreakpointMonitor::new(viewport),
            registry: TriggerRegistry::new(),
            contexts: HashMap::new(),
            by_root: HashMap::new(),
            containers: IndexMap::new(),
            free: FreeTweens::new(),
            styles: StyleCache::new(),
            smooth: None,
            native_scroll: 0.0,
            pending_resize: None,
            samples: Vec::new(),
            pending_writes: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host access for geometry updates. Call [`Self::refresh`] afterwards
    /// if trigger zones should follow the new layout immediately.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn viewport(&self) -> &Viewport {
        self.monitor.viewport()
    }

    pub fn breakpoint(&self) -> BreakpointState {
        self.monitor.state()
    }

    /// Media-query subscriptions, evaluated on every [`Self::resize`].
    pub fn breakpoints_mut(&mut self) -> &mut BreakpointMonitor {
        &mut self.monitor
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// `None` once the context has been reverted (or never existed).
    pub fn context_state(&self, id: ContextId) -> Option<ContextState> {
        self.contexts.get(&id).map(AnimationContext::state)
    }

    pub fn context_of(&self, container: ContainerId) -> Option<ContextId> {
        self.containers.get(&container).and_then(|c| c.context)
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn layout_mode(&self, container: ContainerId) -> Option<LayoutMode> {
        self.containers
            .get(&container)?
            .layout
            .as_ref()
            .map(LayoutSwitcher::mode)
    }

    pub fn carousel(&self, container: ContainerId) -> Option<&CarouselState> {
        self.containers.get(&container)?.layout.as_ref()?.carousel()
    }

    pub fn free_tween_count(&self) -> usize {
        self.free.len()
    }

    pub fn smooth_scroll(&self) -> Option<&SmoothScrollHandle> {
        self.smooth.as_ref()
    }

    /// Offset trigger zones are measured against.
    pub fn scroll_offset(&self) -> f32 {
        self.smooth
            .as_ref()
            .map_or(self.native_scroll, SmoothScrollHandle::offset)
    }

    fn content_width(&self) -> f32 {
        self.monitor.viewport().width
    }

    // ---------- contexts ----------

    /// Create an animation context for `root`. `build` runs after the settle
    /// delay, unless the context is reverted first or `root` has been detached.
    ///
    /// Creating a second context for a root whose previous context is still live
    /// is a caller error: it panics with `strict_contracts`, otherwise the
    /// previous context is reverted first.
    pub fn create_context<F>(&mut self, root: ElementId, build: F) -> ContextId
    where
        F: FnOnce(&mut Scope<'_>) -> Result<(), RevealError> + 'static,
    {
        self.create_context_for(None, root, Box::new(build))
    }

    fn create_context_for(
        &mut self,
        container: Option<ContainerId>,
        root: ElementId,
        build: BuildFn,
    ) -> ContextId {
        if let Some(prev) = self.by_root.get(&root).copied() {
            if self.contexts.get(&prev).is_some_and(AnimationContext::is_live) {
                if self.cfg.strict_contracts {
                    panic!("animation context created twice for {root:?} without revert()");
                }
                log::warn!("{root:?} still has live context {prev:?}; reverting it first");
            }
            self.revert_context(prev);
        }
        let id = self.ids.alloc_context();
        let due = self.now_ms + self.cfg.settle_delay_ms;
        let timer = self.timers.schedule(due, Task::Build(id));
        self.contexts
            .insert(id, AnimationContext::new(id, container, root, timer, build));
        self.by_root.insert(root, id);
        log::debug!("{id:?} created for {root:?}, build due at {due}ms");
        id
    }

    /// Revert a context: cancel its pending build, unregister its triggers, kill
    /// its tweens and restore every property it wrote. Returns false if there was
    /// nothing to revert; calling it again is a no-op.
    pub fn revert_context(&mut self, id: ContextId) -> bool {
        let Some(mut context) = self.contexts.remove(&id) else {
            return false;
        };
        let Some(plan) = context.begin_revert() else {
            return false;
        };
        // writes produced before the revert must reach the host before its clears
        self.flush_samples();

        if let Some(timer) = plan.timer {
            self.timers.cancel(timer);
        }
        let mut touched = self.registry.remove_context(id);
        for tween in plan.tweens {
            touched.extend(self.free.kill(tween));
        }
        touched.extend(plan.touched);
        for (target, property) in touched {
            self.styles.clear(target, property, &mut self.pending_writes);
        }

        let root = context.root();
        if self.by_root.get(&root) == Some(&id) {
            self.by_root.remove(&root);
        }
        if let Some(c) = context
            .container()
            .and_then(|c| self.containers.get_mut(&c))
        {
            if c.context == Some(id) {
                c.context = None;
            }
        }
        log::debug!("{id:?} reverted ({} triggers)", plan.triggers);
        self.events
            .push(StageEvent::ContextReverted { context: id, root });
        true
    }

    fn scope(&mut self, id: ContextId) -> Option<Scope<'_>> {
        let viewport_height = self.monitor.viewport().height;
        let context = self.contexts.get_mut(&id)?;
        Some(Scope {
            context,
            host: &self.host,
            registry: &mut self.registry,
            free: &mut self.free,
            samples: &mut self.samples,
            viewport_height,
            stack: self.cfg.stack,
        })
    }

    fn run_build(&mut self, id: ContextId) {
        let Some(context) = self.contexts.get_mut(&id) else {
            return;
        };
        let Some(build) = context.take_build() else {
            return;
        };
        let root = context.root();
        if !self.host.is_attached(root) {
            context.mark_skipped();
            log::debug!("{id:?}: root {root:?} is not attached; build skipped");
            self.events
                .push(StageEvent::ContextSkipped { context: id, root });
            return;
        }
        let Some(mut scope) = self.scope(id) else {
            return;
        };
        if let Err(err) = build(&mut scope) {
            // partial registrations stay owned by the context and revert with it
            log::warn!("{id:?}: build failed: {err}");
        }
        scope.context.mark_active();
        let triggers = scope.context.triggers().len();

        self.refresh();
        log::debug!("{id:?} built with {triggers} triggers");
        self.events.push(StageEvent::ContextBuilt {
            context: id,
            root,
            triggers,
        });
    }

    /// Re-measure every trigger zone against current host geometry.
    pub fn refresh(&mut self) {
        let vh = self.monitor.viewport().height;
        self.registry.refresh(&self.host, vh);
    }

    // ---------- sections ----------

    fn section_build(section: Rc<dyn Section>, mode: LayoutMode) -> BuildFn {
        Box::new(move |scope: &mut Scope<'_>| section.register(scope, mode))
    }

    /// Mount a section: pick its layout mode, render it and schedule its context.
    pub fn mount<S: Section + 'static>(&mut self, section: S) -> Result<ContainerId, RevealError> {
        let section: Rc<dyn Section> = Rc::new(section);
        let root = section.root();
        if let Some(existing) = self
            .containers
            .iter()
            .find_map(|(id, c)| (c.root == root).then_some(*id))
        {
            if self.cfg.strict_contracts {
                panic!("section root {root:?} mounted twice without unmount()");
            }
            log::warn!("section root {root:?} is already mounted as {existing:?}");
            return Err(RevealError::DoubleRegistration {
                container: existing,
            });
        }

        let layout = match section.layout() {
            Some((metrics, items)) => {
                let mode = decide_mode(&self.monitor.state(), self.content_width(), &metrics);
                Some(LayoutSwitcher::new(metrics, items, mode)?)
            }
            None => None,
        };
        let mode = layout.as_ref().map_or(LayoutMode::Grid, LayoutSwitcher::mode);
        if let Some(l) = &layout {
            self.host.rebuild(root, mode, l.carousel());
        }

        let id = self.ids.alloc_container();
        let context =
            self.create_context_for(Some(id), root, Self::section_build(Rc::clone(&section), mode));
        self.containers.insert(
            id,
            Container {
                section,
                root,
                context: Some(context),
                layout,
            },
        );
        log::debug!("mounted {id:?} at {root:?} in {mode:?}");
        Ok(id)
    }

    /// Tear a section down. Returns false if it was not mounted.
    pub fn unmount(&mut self, container: ContainerId) -> bool {
        let Some(c) = self.containers.shift_remove(&container) else {
            return false;
        };
        if let Some(ctx) = c.context {
            self.revert_context(ctx);
        }
        log::debug!("unmounted {container:?}");
        true
    }

    // ---------- viewport ----------

    /// Report a new viewport. Media-query listeners fire now; layout decisions
    /// wait until resizes have settled for `resize_debounce_ms`.
    pub fn resize(&mut self, viewport: Viewport) {
        let before = self.monitor.state();
        let changes = self.monitor.update(viewport);
        let after = self.monitor.state();
        if before != after {
            self.events
                .push(StageEvent::BreakpointChanged { state: after });
        }
        self.events
            .extend(changes.into_iter().map(|change| StageEvent::MediaChanged { change }));
        if let Some(timer) = self.pending_resize.take() {
            self.timers.cancel(timer);
        }
        let due = self.now_ms + self.cfg.resize_debounce_ms;
        self.pending_resize = Some(self.timers.schedule(due, Task::ResizeSettled));
    }

    fn settle_resize(&mut self) {
        self.pending_resize = None;
        let state = self.monitor.state();
        let width = self.content_width();
        let switches: Vec<(ContainerId, LayoutMode)> = self
            .containers
            .iter()
            .filter_map(|(id, c)| {
                let to = c.layout.as_ref()?.pending_switch(&state, width)?;
                Some((*id, to))
            })
            .collect();
        for (id, to) in switches {
            self.switch_layout(id, to);
        }
        self.refresh();
    }

    fn switch_layout(&mut self, id: ContainerId, to: LayoutMode) {
        let Some(c) = self.containers.get_mut(&id) else {
            return;
        };
        let Some(layout) = c.layout.as_mut() else {
            return;
        };
        if !layout.begin() {
            return;
        }
        let from = layout.mode();
        let root = c.root;
        let section = Rc::clone(&c.section);
        let previous = c.context.take();

        if let Some(ctx) = previous {
            self.revert_context(ctx);
        }

        let Some(layout) = self.containers.get_mut(&id).and_then(|c| c.layout.as_mut()) else {
            return;
        };
        let mode = match layout.commit(to) {
            Ok(()) => to,
            Err(err) => {
                log::warn!("{id:?}: cannot switch to {to:?}: {err}");
                from
            }
        };
        if mode != from {
            let carousel = layout.carousel().copied();
            self.host.rebuild(root, mode, carousel.as_ref());
        }

        let ctx = self.create_context_for(Some(id), root, Self::section_build(section, mode));
        if let Some(c) = self.containers.get_mut(&id) {
            c.context = Some(ctx);
            if let Some(layout) = c.layout.as_mut() {
                layout.finish();
            }
        }
        if mode != from {
            log::debug!("{id:?} switched {from:?} -> {mode:?}");
            self.events.push(StageEvent::LayoutChanged {
                container: id,
                from,
                to: mode,
            });
        }
    }

    // ---------- carousel ----------

    pub fn carousel_next(&mut self, container: ContainerId) -> Result<usize, RevealError> {
        self.navigate(container, CarouselState::next)
    }

    pub fn carousel_previous(&mut self, container: ContainerId) -> Result<usize, RevealError> {
        self.navigate(container, CarouselState::previous)
    }

    fn navigate(
        &mut self,
        id: ContainerId,
        step: fn(&mut CarouselState) -> usize,
    ) -> Result<usize, RevealError> {
        let c = self
            .containers
            .get_mut(&id)
            .ok_or(RevealError::UnknownContainer { container: id })?;
        let carousel = c
            .layout
            .as_mut()
            .and_then(LayoutSwitcher::carousel_mut)
            .ok_or(RevealError::NotCarousel { container: id })?;
        let index = step(carousel);
        let section = Rc::clone(&c.section);
        let context = c.context;

        self.events.push(StageEvent::CarouselMoved {
            container: id,
            index,
        });
        let scope = match context {
            Some(ctx) => self.scope(ctx),
            None => None,
        };
        if let Some(mut scope) = scope {
            section.navigate(&mut scope, index)?;
        }
        self.flush_samples();
        Ok(index)
    }

    // ---------- scrolling ----------

    /// Report the native scroll offset.
    pub fn scroll_to(&mut self, native: f32) {
        self.native_scroll = native;
        if let Some(handle) = self.smooth.as_mut() {
            handle.set_target(native);
        }
    }

    /// Start the smooth-scroll proxy. Only one may be live per process; see
    /// [`SmoothScrollHandle::start`] for how a second start is treated.
    pub fn start_smooth_scroll(
        &mut self,
        wrapper: ElementId,
        content: ElementId,
    ) -> Result<(), RevealError> {
        let mut handle = SmoothScrollHandle::start(
            wrapper,
            content,
            self.cfg.smooth,
            self.cfg.strict_contracts,
        )?;
        handle.jump_to(self.native_scroll);
        self.smooth = Some(handle);
        Ok(())
    }

    pub fn stop_smooth_scroll(&mut self) -> Result<(), RevealError> {
        let handle = self.smooth.take().ok_or(RevealError::SmoothScrollInactive)?;
        handle.stop();
        Ok(())
    }

    // ---------- frame ----------

    fn flush_samples(&mut self) {
        for sample in self.samples.drain(..) {
            // elements removed from the host keep their tweens until refresh
            if !self.host.is_attached(sample.target) {
                continue;
            }
            self.styles.set(sample, &mut self.pending_writes);
        }
    }

    /// Advance to `now_ms` on the host clock: fire due timers, step smooth
    /// scroll, evaluate triggers and tweens, and collect the writes.
    pub fn tick(&mut self, now_ms: f64) -> Frame {
        self.epoch = self.epoch.wrapping_add(1);
        let dt = self
            .last_tick_ms
            .map_or(0.0, |prev| ((now_ms - prev).max(0.0) / 1000.0) as f32);
        self.last_tick_ms = Some(now_ms);
        self.now_ms = now_ms;

        for (_, task) in self.timers.drain_due(now_ms) {
            match task {
                Task::Build(ctx) => self.run_build(ctx),
                Task::ResizeSettled => self.settle_resize(),
            }
        }

        let scroll = match self.smooth.as_mut() {
            Some(handle) => handle.step(dt),
            None => self.native_scroll,
        };

        let mut trigger_events = Vec::new();
        self.registry
            .update(scroll, dt, &mut self.samples, &mut trigger_events);
        self.events
            .extend(trigger_events.into_iter().map(|event| StageEvent::Trigger { event }));
        self.free.update(dt, &mut self.samples);
        self.flush_samples();

        let frame = Frame {
            epoch: self.epoch,
            now_ms,
            dt,
            scroll,
            writes: std::mem::take(&mut self.pending_writes),
            events: std::mem::take(&mut self.events),
        };
        log::trace!(
            "frame {} scroll={} writes={} events={}",
            frame.epoch,
            frame.scroll,
            frame.writes.len(),
            frame.events.len()
        );
        frame
    }
}
