//! Viewport classification and media-query subscriptions.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::RevealError;
use crate::ids::{IdAllocator, SubscriptionId};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_dpr")]
    pub device_pixel_ratio: f32,
}

fn default_dpr() -> f32 {
    1.0
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: 1.0,
        }
    }

    pub fn orientation(&self) -> Orientation {
        if self.height >= self.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport::new(1280.0, 800.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    /// up to 480px
    Mobile,
    /// 481..=768px
    Tablet,
    /// 769..=1024px
    TabletLarge,
    /// 1025px and above
    Desktop,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Pure snapshot of the responsive state, recomputed on every resize.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointState {
    pub bucket: Bucket,
    pub orientation: Orientation,
}

impl BreakpointState {
    pub fn from_viewport(vp: &Viewport) -> Self {
        let w = vp.width;
        let bucket = if w <= 480.0 {
            Bucket::Mobile
        } else if w <= 768.0 {
            Bucket::Tablet
        } else if w <= 1024.0 {
            Bucket::TabletLarge
        } else {
            Bucket::Desktop
        };
        Self {
            bucket,
            orientation: vp.orientation(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Feature {
    MinWidth(f32),
    MaxWidth(f32),
    Orientation(Orientation),
    MinResolution(f32),
    MaxResolution(f32),
}

impl Feature {
    fn eval(&self, vp: &Viewport) -> bool {
        match *self {
            Feature::MinWidth(px) => vp.width >= px,
            Feature::MaxWidth(px) => vp.width <= px,
            Feature::Orientation(o) => vp.orientation() == o,
            Feature::MinResolution(d) => vp.device_pixel_ratio >= d,
            Feature::MaxResolution(d) => vp.device_pixel_ratio <= d,
        }
    }
}

/// Conjunction of media features, e.g. `(min-width: 481px) and (max-width: 768px)`.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaQuery {
    source: String,
    features: Vec<Feature>,
}

impl MediaQuery {
    pub fn matches(&self, vp: &Viewport) -> bool {
        self.features.iter().all(|f| f.eval(vp))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn preset(q: &str) -> Self {
        // presets are literals checked by the tests below
        q.parse().unwrap_or_else(|_| MediaQuery {
            source: q.to_string(),
            features: Vec::new(),
        })
    }

    pub fn mobile() -> Self {
        Self::preset("(max-width: 480px)")
    }
    pub fn tablet() -> Self {
        Self::preset("(min-width: 481px) and (max-width: 768px)")
    }
    pub fn tablet_lg() -> Self {
        Self::preset("(min-width: 769px) and (max-width: 1024px)")
    }
    pub fn desktop() -> Self {
        Self::preset("(min-width: 1025px)")
    }
    pub fn mobile_or_tablet() -> Self {
        Self::preset("(max-width: 768px)")
    }
    pub fn tablet_or_above() -> Self {
        Self::preset("(min-width: 481px)")
    }
    pub fn tablet_lg_or_above() -> Self {
        Self::preset("(min-width: 769px)")
    }
    pub fn portrait() -> Self {
        Self::preset("(orientation: portrait)")
    }
    pub fn landscape() -> Self {
        Self::preset("(orientation: landscape)")
    }
    pub fn retina() -> Self {
        Self::preset("(min-resolution: 2dppx)")
    }
}

fn parse_feature(raw: &str, query: &str) -> Result<Feature, RevealError> {
    let err = |reason: String| RevealError::InvalidMediaQuery {
        query: query.to_string(),
        reason,
    };
    let inner = raw
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| err(format!("'{raw}' is not parenthesised")))?;
    let (name, value) = inner
        .split_once(':')
        .ok_or_else(|| err(format!("'{inner}' has no value")))?;
    let (name, value) = (name.trim(), value.trim());
    let number = |suffix: &str| -> Result<f32, RevealError> {
        value
            .strip_suffix(suffix)
            .unwrap_or(value)
            .trim()
            .parse::<f32>()
            .map_err(|_| err(format!("'{value}' is not a number")))
    };
    match name {
        "min-width" => Ok(Feature::MinWidth(number("px")?)),
        "max-width" => Ok(Feature::MaxWidth(number("px")?)),
        "min-resolution" => Ok(Feature::MinResolution(number("dppx")?)),
        "max-resolution" => Ok(Feature::MaxResolution(number("dppx")?)),
        "orientation" => match value {
            "portrait" => Ok(Feature::Orientation(Orientation::Portrait)),
            "landscape" => Ok(Feature::Orientation(Orientation::Landscape)),
            other => Err(err(format!("unknown orientation '{other}'"))),
        },
        other => Err(err(format!("unsupported feature '{other}'"))),
    }
}

impl FromStr for MediaQuery {
    type Err = RevealError;

    fn from_str(q: &str) -> Result<Self, Self::Err> {
        let features = q
            .split(" and ")
            .map(|part| parse_feature(part, q))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MediaQuery {
            source: q.to_string(),
            features,
        })
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A match-state change delivered to one subscription.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchChange {
    pub subscription: SubscriptionId,
    pub matches: bool,
}

type Listener = Box<dyn FnMut(bool)>;

struct Subscriber {
    query: MediaQuery,
    matches: bool,
    listener: Option<Listener>,
}

/// Evaluates media queries against the live viewport and notifies on change.
///
/// The host-level resize listener is reference counted: it is attached on the
/// first subscription and detached when the last one goes away
/// (see [`BreakpointMonitor::is_listening`]).
pub struct BreakpointMonitor {
    viewport: Viewport,
    ids: IdAllocator,
    subs: IndexMap<SubscriptionId, Subscriber>,
    listening: bool,
}

impl fmt::Debug for BreakpointMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakpointMonitor")
            .field("viewport", &self.viewport)
            .field("subscribers", &self.subs.len())
            .field("listening", &self.listening)
            .finish()
    }
}

impl BreakpointMonitor {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ids: IdAllocator::new(),
            subs: IndexMap::new(),
            listening: false,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn state(&self) -> BreakpointState {
        BreakpointState::from_viewport(&self.viewport)
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Subscribe without a callback; changes are reported through [`Self::update`].
    pub fn subscribe(&mut self, query: MediaQuery) -> (bool, SubscriptionId) {
        self.insert(query, None)
    }

    /// Subscribe with a callback invoked synchronously from [`Self::update`].
    pub fn subscribe_with(
        &mut self,
        query: MediaQuery,
        listener: impl FnMut(bool) + 'static,
    ) -> (bool, SubscriptionId) {
        self.insert(query, Some(Box::new(listener)))
    }

    fn insert(&mut self, query: MediaQuery, listener: Option<Listener>) -> (bool, SubscriptionId) {
        let id = self.ids.alloc_subscription();
        let matches = query.matches(&self.viewport);
        if !self.listening {
            log::debug!("breakpoint monitor: attaching resize listener");
            self.listening = true;
        }
        self.subs.insert(
            id,
            Subscriber {
                query,
                matches,
                listener,
            },
        );
        (matches, id)
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let removed = self.subs.shift_remove(&id).is_some();
        if removed && self.subs.is_empty() && self.listening {
            log::debug!("breakpoint monitor: detaching resize listener");
            self.listening = false;
        }
        removed
    }

    pub fn matches(&self, id: SubscriptionId) -> Option<bool> {
        self.subs.get(&id).map(|s| s.matches)
    }

    /// Re-evaluate every subscription against `viewport`, invoking listeners for
    /// those whose match state flipped. All notifications for one resize are
    /// delivered before this returns.
    pub fn update(&mut self, viewport: Viewport) -> Vec<MatchChange> {
        self.viewport = viewport;
        let mut changes = Vec::new();
        for (id, sub) in self.subs.iter_mut() {
            let now = sub.query.matches(&viewport);
            if now != sub.matches {
                sub.matches = now;
                log::trace!("media query '{}' -> {}", sub.query, now);
                if let Some(listener) = sub.listener.as_mut() {
                    listener(now);
                }
                changes.push(MatchChange {
                    subscription: *id,
                    matches: now,
                });
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn buckets_follow_width_ranges() {
        let b = |w| BreakpointState::from_viewport(&Viewport::new(w, 900.0)).bucket;
        assert_eq!(b(320.0), Bucket::Mobile);
        assert_eq!(b(480.0), Bucket::Mobile);
        assert_eq!(b(481.0), Bucket::Tablet);
        assert_eq!(b(768.0), Bucket::Tablet);
        assert_eq!(b(769.0), Bucket::TabletLarge);
        assert_eq!(b(1024.0), Bucket::TabletLarge);
        assert_eq!(b(1025.0), Bucket::Desktop);
    }

    #[test]
    fn presets_parse_and_agree_with_buckets() {
        for q in [
            MediaQuery::mobile(),
            MediaQuery::tablet(),
            MediaQuery::tablet_lg(),
            MediaQuery::desktop(),
            MediaQuery::mobile_or_tablet(),
            MediaQuery::tablet_or_above(),
            MediaQuery::tablet_lg_or_above(),
            MediaQuery::portrait(),
            MediaQuery::landscape(),
            MediaQuery::retina(),
        ] {
            assert!(!q.features.is_empty(), "{q} did not parse");
        }
        let vp = Viewport::new(600.0, 900.0);
        assert!(MediaQuery::tablet().matches(&vp));
        assert!(!MediaQuery::mobile().matches(&vp));
        assert!(MediaQuery::portrait().matches(&vp));
        assert!(!MediaQuery::retina().matches(&vp));
    }

    #[test]
    fn bad_queries_are_rejected() {
        assert!("max-width: 480px".parse::<MediaQuery>().is_err());
        assert!("(hover: hover)".parse::<MediaQuery>().is_err());
        assert!("(max-width: wide)".parse::<MediaQuery>().is_err());
    }

    #[test]
    fn notifies_only_on_change() {
        let mut mon = BreakpointMonitor::new(Viewport::new(1200.0, 800.0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let (initial, id) = mon.subscribe_with(MediaQuery::mobile(), move |m| sink.borrow_mut().push(m));
        assert!(!initial);

        assert!(mon.update(Viewport::new(1100.0, 800.0)).is_empty());
        let changes = mon.update(Viewport::new(400.0, 800.0));
        assert_eq!(changes, vec![MatchChange { subscription: id, matches: true }]);
        mon.update(Viewport::new(390.0, 800.0));
        mon.update(Viewport::new(900.0, 800.0));
        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn listener_is_reference_counted() {
        let mut mon = BreakpointMonitor::new(Viewport::default());
        assert!(!mon.is_listening());
        let (_, a) = mon.subscribe(MediaQuery::mobile());
        let (_, b) = mon.subscribe(MediaQuery::desktop());
        assert!(mon.is_listening());
        assert!(mon.unsubscribe(a));
        assert!(mon.is_listening());
        assert!(!mon.unsubscribe(a));
        assert!(mon.unsubscribe(b));
        assert!(!mon.is_listening());
    }

    #[test]
    fn concurrent_predicates_fire_in_one_update() {
        let mut mon = BreakpointMonitor::new(Viewport::new(1200.0, 800.0));
        let (_, m) = mon.subscribe(MediaQuery::mobile());
        let (_, d) = mon.subscribe(MediaQuery::desktop());
        let (_, p) = mon.subscribe(MediaQuery::portrait());
        let changes = mon.update(Viewport::new(400.0, 800.0));
        let ids: Vec<_> = changes.iter().map(|c| c.subscription).collect();
        assert_eq!(ids, vec![m, d, p]);
    }
}
