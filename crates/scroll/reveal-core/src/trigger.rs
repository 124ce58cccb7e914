//! Scroll-bound triggers and the registry that evaluates them.
//!
//! Triggers are immutable once registered. The registry owns the runtime side
//! (resolved zone, phase, timeline) and evaluates entries in registration order.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::document::Host;
use crate::easing::Ease;
use crate::error::RevealError;
use crate::ids::{ContextId, ElementId, IdAllocator, TriggerId};
use crate::tween::{Property, Sample, Timeline, Tween};
use crate::zone::{Anchor, ZoneEdge};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Plays its timeline the first time the zone is entered, then goes inert.
    OneShotReveal,
    /// Runs the configured toggle action on each zone boundary crossing.
    ToggleReveal,
    /// Binds timeline progress to scroll progress through the zone, optionally pinning.
    PinnedScrub,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Play,
    Reverse,
    Restart,
    Reset,
    Complete,
    None,
}

impl ToggleAction {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "play" => ToggleAction::Play,
            "reverse" => ToggleAction::Reverse,
            "restart" => ToggleAction::Restart,
            "reset" => ToggleAction::Reset,
            "complete" => ToggleAction::Complete,
            "none" => ToggleAction::None,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            ToggleAction::Play => "play",
            ToggleAction::Reverse => "reverse",
            ToggleAction::Restart => "restart",
            ToggleAction::Reset => "reset",
            ToggleAction::Complete => "complete",
            ToggleAction::None => "none",
        }
    }

    fn apply(self, timeline: &mut Timeline) {
        match self {
            ToggleAction::Play => timeline.play(),
            ToggleAction::Reverse => timeline.reverse(),
            ToggleAction::Restart => timeline.restart(),
            ToggleAction::Reset => timeline.reset(),
            ToggleAction::Complete => timeline.complete(),
            ToggleAction::None => {}
        }
    }
}

/// Actions for the four boundary crossings, written
/// `"<enter> <leave> <enterBack> <leaveBack>"`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ToggleActions {
    pub on_enter: ToggleAction,
    pub on_leave: ToggleAction,
    pub on_enter_back: ToggleAction,
    pub on_leave_back: ToggleAction,
}

impl ToggleActions {
    /// Play on entry, reverse on leaving in either direction.
    pub const PLAY_REVERSE: ToggleActions = ToggleActions {
        on_enter: ToggleAction::Play,
        on_leave: ToggleAction::Reverse,
        on_enter_back: ToggleAction::Play,
        on_leave_back: ToggleAction::Reverse,
    };

    fn for_crossing(&self, crossing: Crossing) -> ToggleAction {
        match crossing {
            Crossing::Enter => self.on_enter,
            Crossing::Leave => self.on_leave,
            Crossing::EnterBack => self.on_enter_back,
            Crossing::LeaveBack => self.on_leave_back,
        }
    }
}

impl Default for ToggleActions {
    fn default() -> Self {
        ToggleActions::PLAY_REVERSE
    }
}

impl FromStr for ToggleActions {
    type Err = RevealError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = || RevealError::InvalidToggleActions {
            spec: spec.to_string(),
        };
        let slots = spec
            .split_whitespace()
            .map(|s| ToggleAction::parse(s).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()?;
        let [on_enter, on_leave, on_enter_back, on_leave_back] = slots[..] else {
            return Err(invalid());
        };
        Ok(ToggleActions {
            on_enter,
            on_leave,
            on_enter_back,
            on_leave_back,
        })
    }
}

impl fmt::Display for ToggleActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.on_enter.as_str(),
            self.on_leave.as_str(),
            self.on_enter_back.as_str(),
            self.on_leave_back.as_str()
        )
    }
}

impl Serialize for ToggleActions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ToggleActions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Caller-facing description of a trigger, consumed by registration.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerSpec {
    pub kind: TriggerKind,
    /// Element whose bounds the zone is measured against.
    pub anchor: ElementId,
    pub zone_start: ZoneEdge,
    /// Defaults to `bottom top` of the anchor.
    pub zone_end: Option<ZoneEdge>,
    /// Element the end edge is measured against, if not the anchor.
    pub end_anchor: Option<ElementId>,
    pub tweens: Vec<Tween>,
    pub toggle_actions: ToggleActions,
    pub once: bool,
    pub pin: bool,
}

impl TriggerSpec {
    fn base(kind: TriggerKind, anchor: ElementId, start: ZoneEdge) -> Self {
        Self {
            kind,
            anchor,
            zone_start: start,
            zone_end: None,
            end_anchor: None,
            tweens: Vec::new(),
            toggle_actions: ToggleActions::default(),
            once: false,
            pin: false,
        }
    }

    pub fn one_shot(anchor: ElementId, start: ZoneEdge) -> Self {
        let mut spec = Self::base(TriggerKind::OneShotReveal, anchor, start);
        spec.once = true;
        spec
    }

    pub fn toggle(anchor: ElementId, start: ZoneEdge, actions: ToggleActions) -> Self {
        let mut spec = Self::base(TriggerKind::ToggleReveal, anchor, start);
        spec.toggle_actions = actions;
        spec
    }

    pub fn scrub(anchor: ElementId, start: ZoneEdge, end: ZoneEdge) -> Self {
        let mut spec = Self::base(TriggerKind::PinnedScrub, anchor, start);
        spec.zone_end = Some(end);
        spec
    }

    pub fn with_tween(mut self, tween: Tween) -> Self {
        self.tweens.push(tween);
        self
    }

    pub fn with_end_anchor(mut self, end_anchor: ElementId) -> Self {
        self.end_anchor = Some(end_anchor);
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pin = true;
        self
    }
}

/// A registered trigger. Immutable; re-registration creates a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct Trigger {
    id: TriggerId,
    context: ContextId,
    root: ElementId,
    spec: TriggerSpec,
}

impl Trigger {
    pub fn id(&self) -> TriggerId {
        self.id
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn kind(&self) -> TriggerKind {
        self.spec.kind
    }

    pub fn anchor(&self) -> ElementId {
        self.spec.anchor
    }

    pub fn zone_start(&self) -> &ZoneEdge {
        &self.spec.zone_start
    }

    pub fn zone_end(&self) -> Option<&ZoneEdge> {
        self.spec.zone_end.as_ref()
    }

    pub fn once(&self) -> bool {
        self.spec.once
    }

    pub fn pin(&self) -> bool {
        self.spec.pin
    }

    /// Every animated element, in first-seen order.
    pub fn targets(&self) -> Vec<ElementId> {
        let mut out: Vec<ElementId> = Vec::new();
        for tw in &self.spec.tweens {
            for t in &tw.targets {
                if !out.contains(t) {
                    out.push(*t);
                }
            }
        }
        if out.is_empty() {
            out.push(self.spec.anchor);
        }
        out
    }

    /// Stagger of the primary tween.
    pub fn stagger_delay_seconds(&self) -> f32 {
        self.spec.tweens.first().map_or(0.0, |t| t.spec.stagger)
    }

    /// Easing of the primary tween.
    pub fn easing(&self) -> Ease {
        self.spec.tweens.first().map_or(Ease::Linear, |t| t.spec.ease)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossing {
    Enter,
    Leave,
    EnterBack,
    LeaveBack,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Before,
    Active,
    After,
}

/// Something observable that happened while evaluating triggers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriggerEvent {
    Crossed {
        trigger: TriggerId,
        crossing: Crossing,
    },
    Pinned {
        trigger: TriggerId,
        target: ElementId,
    },
    Unpinned {
        trigger: TriggerId,
        target: ElementId,
    },
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct ResolvedZone {
    start: f32,
    end: f32,
}

#[derive(Debug)]
struct Entry {
    trigger: Trigger,
    zone: ResolvedZone,
    timeline: Timeline,
    phase: Option<Phase>,
    fired: bool,
    pinned: bool,
}

impl Entry {
    fn phase_at(&self, scroll: f32) -> Phase {
        if scroll < self.zone.start {
            Phase::Before
        } else if scroll > self.zone.end {
            Phase::After
        } else {
            Phase::Active
        }
    }

    fn scrub_progress(&self, scroll: f32) -> f32 {
        let span = self.zone.end - self.zone.start;
        if span <= 0.0 {
            if scroll >= self.zone.start {
                1.0
            } else {
                0.0
            }
        } else {
            ((scroll - self.zone.start) / span).clamp(0.0, 1.0)
        }
    }
}

fn crossings(from: Phase, to: Phase) -> &'static [Crossing] {
    use Crossing::*;
    match (from, to) {
        (Phase::Before, Phase::Active) => &[Enter],
        (Phase::Before, Phase::After) => &[Enter, Leave],
        (Phase::Active, Phase::After) => &[Leave],
        (Phase::After, Phase::Active) => &[EnterBack],
        (Phase::After, Phase::Before) => &[EnterBack, LeaveBack],
        (Phase::Active, Phase::Before) => &[LeaveBack],
        _ => &[],
    }
}

fn resolve_zone(spec: &TriggerSpec, host: &dyn Host, viewport_height: f32) -> Option<ResolvedZone> {
    let bounds = host.bounds(spec.anchor)?;
    let start = spec.zone_start.resolve(&bounds, viewport_height);
    let end_bounds = match spec.end_anchor {
        Some(el) => host.bounds(el)?,
        None => bounds,
    };
    let end_edge = spec
        .zone_end
        .unwrap_or_else(|| ZoneEdge::new(Anchor::Bottom, Anchor::Top));
    let end = end_edge.resolve(&end_bounds, viewport_height).max(start);
    Some(ResolvedZone { start, end })
}

/// Ordered set of live triggers.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    ids: IdAllocator,
    entries: IndexMap<TriggerId, Entry>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_for(&self, context: ContextId) -> usize {
        self.entries
            .values()
            .filter(|e| e.trigger.context == context)
            .count()
    }

    pub fn get(&self, id: TriggerId) -> Option<&Trigger> {
        self.entries.get(&id).map(|e| &e.trigger)
    }

    /// Registered triggers in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.entries.values().map(|e| &e.trigger)
    }

    /// Whether a one-shot trigger has already fired.
    pub fn has_fired(&self, id: TriggerId) -> bool {
        self.entries.get(&id).is_some_and(|e| e.fired)
    }

    /// Resolved `(start, end)` scroll offsets of a trigger's zone.
    pub fn zone(&self, id: TriggerId) -> Option<(f32, f32)> {
        self.entries.get(&id).map(|e| (e.zone.start, e.zone.end))
    }

    /// Register a trigger, writing its initial (from) state into `samples`.
    ///
    /// Returns `Ok(None)` when the anchor is not laid out; such triggers are
    /// skipped rather than registered against a detached element.
    pub fn register(
        &mut self,
        context: ContextId,
        root: ElementId,
        spec: TriggerSpec,
        host: &dyn Host,
        viewport_height: f32,
        samples: &mut Vec<Sample>,
    ) -> Result<Option<TriggerId>, RevealError> {
        let Some(zone) = resolve_zone(&spec, host, viewport_height) else {
            log::debug!("trigger anchor {:?} has no layout; skipping", spec.anchor);
            return Ok(None);
        };
        let id = self.ids.alloc_trigger();
        let trigger = Trigger {
            id,
            context,
            root,
            spec,
        };
        let targets = trigger.targets();
        let duplicate = self.entries.values().any(|e| {
            e.trigger.context == context && e.trigger.root == root && e.trigger.targets() == targets
        });
        if duplicate {
            return Err(RevealError::DuplicateTrigger { root });
        }
        let timeline = Timeline::new(trigger.spec.tweens.clone());
        timeline.sample_into(samples);
        log::debug!(
            "registered {:?} {:?} zone {}..{}",
            trigger.spec.kind,
            id,
            zone.start,
            zone.end
        );
        self.entries.insert(
            id,
            Entry {
                trigger,
                zone,
                timeline,
                phase: None,
                fired: false,
                pinned: false,
            },
        );
        Ok(Some(id))
    }

    /// Remove every trigger owned by `context`, returning the (target, property)
    /// pairs they wrote so the caller can restore them.
    pub fn remove_context(&mut self, context: ContextId) -> Vec<(ElementId, Property)> {
        let mut touched = Vec::new();
        self.entries.retain(|_, e| {
            if e.trigger.context != context {
                return true;
            }
            touched.extend(e.timeline.touched());
            if e.trigger.spec.pin {
                touched.push((e.trigger.spec.anchor, Property::PinOffset));
            }
            false
        });
        touched
    }

    /// Re-measure every zone against current layout. Entries whose anchor has
    /// gone missing keep their previous zone.
    pub fn refresh(&mut self, host: &dyn Host, viewport_height: f32) {
        for entry in self.entries.values_mut() {
            if let Some(zone) = resolve_zone(&entry.trigger.spec, host, viewport_height) {
                entry.zone = zone;
            }
        }
    }

    /// Evaluate all triggers at `scroll`, then advance running timelines by `dt`.
    pub fn update(
        &mut self,
        scroll: f32,
        dt: f32,
        samples: &mut Vec<Sample>,
        events: &mut Vec<TriggerEvent>,
    ) {
        for entry in self.entries.values_mut() {
            let id = entry.trigger.id;
            let phase = entry.phase_at(scroll);
            let before_time = entry.timeline.time();
            let mut dirty = false;

            match entry.trigger.spec.kind {
                TriggerKind::PinnedScrub => {
                    entry.timeline.seek_progress(entry.scrub_progress(scroll));
                    if entry.trigger.spec.pin {
                        let anchor = entry.trigger.spec.anchor;
                        let active = phase == Phase::Active;
                        if active != entry.pinned {
                            entry.pinned = active;
                            events.push(if active {
                                TriggerEvent::Pinned { trigger: id, target: anchor }
                            } else {
                                TriggerEvent::Unpinned { trigger: id, target: anchor }
                            });
                        }
                        let held = (scroll - entry.zone.start).clamp(0.0, entry.zone.end - entry.zone.start);
                        samples.push(Sample {
                            target: anchor,
                            property: Property::PinOffset,
                            value: held,
                        });
                    }
                }
                TriggerKind::OneShotReveal | TriggerKind::ToggleReveal => {
                    let previous = entry.phase.unwrap_or(Phase::Before);
                    for &crossing in crossings(previous, phase) {
                        if entry.trigger.spec.once && entry.fired {
                            break;
                        }
                        events.push(TriggerEvent::Crossed {
                            trigger: id,
                            crossing,
                        });
                        if entry.trigger.spec.once {
                            if crossing == Crossing::Enter {
                                entry.timeline.play();
                                entry.fired = true;
                                dirty = true;
                            }
                        } else {
                            entry
                                .trigger
                                .spec
                                .toggle_actions
                                .for_crossing(crossing)
                                .apply(&mut entry.timeline);
                            dirty = true;
                        }
                    }
                }
            }
            entry.phase = Some(phase);

            entry.timeline.advance(dt);
            if dirty || entry.timeline.time() != before_time {
                entry.timeline.sample_into(samples);
            }
        }
    }
}
