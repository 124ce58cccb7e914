//! Staggered property tweens, timelines and the write-dedup cache.
//!
//! A [`Tween`] animates the same property ranges over an ordered list of
//! targets; target `i` starts at `delay + stagger * i`. A [`Timeline`] groups
//! tweens that play, reverse and scrub together.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::easing::Ease;
use crate::ids::ElementId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Property {
    Opacity,
    /// Vertical offset in px.
    TranslateY,
    Scale,
    /// Top clip inset in percent (100 = fully hidden).
    ClipInsetTop,
    /// Width as a fraction of the resting width.
    Width,
    /// Translation (px) that holds a pinned element in place while scrolling.
    PinOffset,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyRange {
    pub property: Property,
    pub from: f32,
    pub to: f32,
}

impl PropertyRange {
    pub fn new(property: Property, from: f32, to: f32) -> Self {
        Self { property, from, to }
    }
}

/// Timing and value ranges for one tween, independent of its targets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TweenSpec {
    pub props: Vec<PropertyRange>,
    #[serde(default = "default_duration")]
    pub duration: f32,
    #[serde(default)]
    pub delay: f32,
    #[serde(default)]
    pub stagger: f32,
    #[serde(default)]
    pub ease: Ease,
}

fn default_duration() -> f32 {
    0.5
}

impl TweenSpec {
    pub fn new(props: Vec<PropertyRange>, duration: f32) -> Self {
        Self {
            props,
            duration,
            delay: 0.0,
            stagger: 0.0,
            ease: Ease::default(),
        }
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_stagger(mut self, stagger: f32) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }
}

/// A value computed for one (target, property) at the current time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sample {
    pub target: ElementId,
    pub property: Property,
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tween {
    pub targets: Vec<ElementId>,
    pub spec: TweenSpec,
}

impl Tween {
    pub fn new(targets: Vec<ElementId>, spec: TweenSpec) -> Self {
        Self { targets, spec }
    }

    /// Start offset of target `index` within the tween.
    #[inline]
    pub fn start_of(&self, index: usize) -> f32 {
        self.spec.delay + self.spec.stagger * index as f32
    }

    pub fn total_duration(&self) -> f32 {
        if self.targets.is_empty() {
            return 0.0;
        }
        self.start_of(self.targets.len() - 1) + self.spec.duration.max(0.0)
    }

    pub fn sample_into(&self, time: f32, out: &mut Vec<Sample>) {
        for (i, target) in self.targets.iter().enumerate() {
            let local = time - self.start_of(i);
            let t = if self.spec.duration <= 0.0 {
                if local >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                (local / self.spec.duration).clamp(0.0, 1.0)
            };
            let eased = self.spec.ease.apply(t);
            for range in &self.spec.props {
                out.push(Sample {
                    target: *target,
                    property: range.property,
                    value: range.from + (range.to - range.from) * eased,
                });
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    /// At rest; not advancing.
    Paused,
    Forward,
    Reverse,
}

/// Tweens played as one unit on a shared clock.
#[derive(Clone, Debug)]
pub struct Timeline {
    tweens: Vec<Tween>,
    time: f32,
    state: PlayState,
    duration: f32,
}

impl Timeline {
    pub fn new(tweens: Vec<Tween>) -> Self {
        let duration = tweens
            .iter()
            .map(Tween::total_duration)
            .fold(0.0_f32, f32::max);
        Self {
            tweens,
            time: 0.0,
            state: PlayState::Paused,
            duration,
        }
    }

    pub fn tweens(&self) -> &[Tween] {
        &self.tweens
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            if self.time > 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            (self.time / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn play(&mut self) {
        self.state = PlayState::Forward;
    }

    pub fn reverse(&mut self) {
        self.state = PlayState::Reverse;
    }

    pub fn restart(&mut self) {
        self.time = 0.0;
        self.state = PlayState::Forward;
    }

    /// Jump back to the start and stop.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.state = PlayState::Paused;
    }

    /// Jump to the end and stop.
    pub fn complete(&mut self) {
        self.time = self.duration;
        self.state = PlayState::Paused;
    }

    /// Scrub to `progress` in [0, 1]; scrubbed timelines never self-advance.
    pub fn seek_progress(&mut self, progress: f32) {
        self.time = progress.clamp(0.0, 1.0) * self.duration;
        self.state = PlayState::Paused;
    }

    /// Advance by `dt` seconds. Playback stops at either end.
    /// Returns true if the timeline is still running afterwards.
    pub fn advance(&mut self, dt: f32) -> bool {
        match self.state {
            PlayState::Paused => return false,
            PlayState::Forward => {
                self.time = (self.time + dt).min(self.duration);
                if self.time >= self.duration {
                    self.state = PlayState::Paused;
                }
            }
            PlayState::Reverse => {
                self.time = (self.time - dt).max(0.0);
                if self.time <= 0.0 {
                    self.state = PlayState::Paused;
                }
            }
        }
        self.state != PlayState::Paused
    }

    pub fn sample_into(&self, out: &mut Vec<Sample>) {
        for tween in &self.tweens {
            tween.sample_into(self.time, out);
        }
    }

    /// Every (target, property) pair this timeline writes.
    pub fn touched(&self) -> impl Iterator<Item = (ElementId, Property)> + '_ {
        self.tweens.iter().flat_map(|tw| {
            tw.targets
                .iter()
                .flat_map(move |t| tw.spec.props.iter().map(move |r| (*t, r.property)))
        })
    }
}

/// A property change for the host to apply.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyWrite {
    pub target: ElementId,
    pub property: Property,
    /// `None` restores the element's own (stylesheet) value.
    pub value: Option<f32>,
}

/// Last value written per (target, property); suppresses redundant writes.
#[derive(Debug, Default)]
pub struct StyleCache {
    applied: HashMap<(ElementId, Property), f32>,
}

const WRITE_EPSILON: f32 = 1e-5;

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, target: ElementId, property: Property) -> Option<f32> {
        self.applied.get(&(target, property)).copied()
    }

    pub fn set(&mut self, sample: Sample, out: &mut Vec<PropertyWrite>) {
        let key = (sample.target, sample.property);
        let changed = match self.applied.get(&key) {
            Some(prev) => (prev - sample.value).abs() > WRITE_EPSILON,
            None => true,
        };
        if changed {
            self.applied.insert(key, sample.value);
            out.push(PropertyWrite {
                target: sample.target,
                property: sample.property,
                value: Some(sample.value),
            });
        }
    }

    pub fn clear(&mut self, target: ElementId, property: Property, out: &mut Vec<PropertyWrite>) {
        if self.applied.remove(&(target, property)).is_some() {
            out.push(PropertyWrite {
                target,
                property,
                value: None,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "left={a} right={b}");
    }

    fn fade(n: u32, stagger: f32) -> Tween {
        Tween::new(
            (0..n).map(ElementId).collect(),
            TweenSpec::new(vec![PropertyRange::new(Property::Opacity, 0.0, 1.0)], 1.0)
                .with_stagger(stagger)
                .with_ease(Ease::Linear),
        )
    }

    fn values(tl: &Timeline) -> Vec<f32> {
        let mut out = Vec::new();
        tl.sample_into(&mut out);
        out.into_iter().map(|s| s.value).collect()
    }

    #[test]
    fn stagger_offsets_each_target() {
        let tw = fade(3, 0.2);
        approx(tw.total_duration(), 1.4);
        let mut out = Vec::new();
        tw.sample_into(0.5, &mut out);
        approx(out[0].value, 0.5);
        approx(out[1].value, 0.3);
        approx(out[2].value, 0.1);
    }

    #[test]
    fn plays_forward_then_reverses_to_start() {
        let mut tl = Timeline::new(vec![fade(2, 0.5)]);
        assert_eq!(values(&tl), vec![0.0, 0.0]);
        tl.play();
        while tl.advance(0.1) {}
        approx(tl.time(), 1.5);
        assert_eq!(values(&tl), vec![1.0, 1.0]);
        tl.reverse();
        assert!(tl.advance(0.5));
        approx(values(&tl)[1], 0.5);
        while tl.advance(0.1) {}
        assert_eq!(values(&tl), vec![0.0, 0.0]);
    }

    #[test]
    fn seek_progress_maps_linearly() {
        let mut tl = Timeline::new(vec![fade(1, 0.0)]);
        tl.seek_progress(0.25);
        approx(values(&tl)[0], 0.25);
        tl.seek_progress(4.0);
        approx(tl.progress(), 1.0);
        assert!(!tl.advance(1.0));
    }

    #[test]
    fn cache_suppresses_repeats_and_clears_once() {
        let mut cache = StyleCache::new();
        let mut out = Vec::new();
        let s = Sample {
            target: ElementId(1),
            property: Property::Opacity,
            value: 0.5,
        };
        cache.set(s, &mut out);
        cache.set(s, &mut out);
        assert_eq!(out.len(), 1);
        cache.clear(ElementId(1), Property::Opacity, &mut out);
        cache.clear(ElementId(1), Property::Opacity, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].value, None);
    }
}
