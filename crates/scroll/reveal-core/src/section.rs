//! Section mount hooks.
//!
//! A [`Section`] describes what one page section registers inside its
//! animation context for a given layout mode. The stage owns the lifecycle
//! (settle delay, revert, rebuild); sections only declare triggers.
//!
//! Three data-driven kinds cover the site:
//! - [`RevealSection`]: staggered reveal groups on one toggle or one-shot trigger,
//!   plus an optional scrubbed header bar.
//! - [`StackedCardsSection`]: pinned cards that shrink by stacking depth, each
//!   with a one-shot image and text reveal.
//! - [`GallerySection`]: grid with a pinned scrub, or a carousel that fades the
//!   current item on every navigation.

use serde::{Deserialize, Serialize};

use crate::context::Scope;
use crate::easing::{Direction, Ease};
use crate::error::RevealError;
use crate::ids::ElementId;
use crate::layout::{GridMetrics, LayoutMode};
use crate::trigger::{ToggleAction, ToggleActions, TriggerSpec};
use crate::tween::{Property, PropertyRange, Tween, TweenSpec};
use crate::zone::{Anchor, Point, ZoneEdge};

pub trait Section {
    /// Container element the section's context is scoped to.
    fn root(&self) -> ElementId;

    /// Grid geometry and item count for sections that switch between grid and carousel.
    fn layout(&self) -> Option<(GridMetrics, usize)> {
        None
    }

    /// Register the triggers for `mode`. Runs once per context, after the settle delay.
    fn register(&self, scope: &mut Scope<'_>, mode: LayoutMode) -> Result<(), RevealError>;

    /// React to carousel navigation (the index has already changed).
    fn navigate(&self, _scope: &mut Scope<'_>, _index: usize) -> Result<(), RevealError> {
        Ok(())
    }
}

fn edge(element: Anchor, element_offset: f32, viewport: Anchor, viewport_offset: f32) -> ZoneEdge {
    ZoneEdge {
        element: Point {
            anchor: element,
            offset: element_offset,
        },
        viewport: Point {
            anchor: viewport,
            offset: viewport_offset,
        },
    }
}

// ---------- reveal ----------

/// Elements matched by `selector` animated with `tween`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevealGroup {
    pub selector: String,
    pub tween: TweenSpec,
}

/// Width bar scrubbed while the section enters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderBar {
    pub selector: String,
    #[serde(default = "HeaderBar::default_start")]
    pub start: ZoneEdge,
    #[serde(default = "HeaderBar::default_end")]
    pub end: ZoneEdge,
}

impl HeaderBar {
    fn default_start() -> ZoneEdge {
        ZoneEdge::new(Anchor::Top, Anchor::Percent(80.0))
    }

    fn default_end() -> ZoneEdge {
        ZoneEdge::new(Anchor::Top, Anchor::Percent(50.0))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevealPreset {
    pub root: ElementId,
    #[serde(default = "RevealPreset::default_start")]
    pub start: ZoneEdge,
    #[serde(default)]
    pub end: Option<ZoneEdge>,
    /// Fire once and stay revealed instead of toggling.
    #[serde(default)]
    pub once: bool,
    #[serde(default = "RevealPreset::default_actions")]
    pub toggle_actions: ToggleActions,
    pub groups: Vec<RevealGroup>,
    #[serde(default)]
    pub header_bar: Option<HeaderBar>,
}

impl RevealPreset {
    fn default_start() -> ZoneEdge {
        ZoneEdge::new(Anchor::Top, Anchor::Percent(70.0))
    }

    fn default_actions() -> ToggleActions {
        ToggleActions {
            on_enter: ToggleAction::Play,
            on_leave: ToggleAction::None,
            on_enter_back: ToggleAction::None,
            on_leave_back: ToggleAction::Reverse,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RevealSection {
    preset: RevealPreset,
}

impl RevealSection {
    pub fn new(preset: RevealPreset) -> Self {
        Self { preset }
    }

    pub fn from_json(json: &str) -> Result<Self, RevealError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn preset(&self) -> &RevealPreset {
        &self.preset
    }
}

impl Section for RevealSection {
    fn root(&self) -> ElementId {
        self.preset.root
    }

    fn register(&self, scope: &mut Scope<'_>, _mode: LayoutMode) -> Result<(), RevealError> {
        let p = &self.preset;
        let root = scope.root();

        let mut tweens = Vec::with_capacity(p.groups.len());
        for group in &p.groups {
            let targets = scope.query(&group.selector)?;
            if targets.is_empty() {
                log::debug!("reveal group '{}' matched nothing", group.selector);
                continue;
            }
            tweens.push(Tween::new(targets, group.tween.clone()));
        }
        if !tweens.is_empty() {
            let mut spec = if p.once {
                TriggerSpec::one_shot(root, p.start)
            } else {
                TriggerSpec::toggle(root, p.start, p.toggle_actions)
            };
            spec.zone_end = p.end;
            spec.tweens = tweens;
            scope.register(spec)?;
        }

        if let Some(bar) = &p.header_bar {
            let bars = scope.query(&bar.selector)?;
            if !bars.is_empty() {
                let grow = TweenSpec::new(vec![PropertyRange::new(Property::Width, 0.0, 1.0)], 1.0)
                    .with_ease(Ease::Linear);
                scope.register(
                    TriggerSpec::scrub(root, bar.start, bar.end).with_tween(Tween::new(bars, grow)),
                )?;
            }
        }
        Ok(())
    }
}

// ---------- stacked cards ----------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackedCardsPreset {
    pub root: ElementId,
    #[serde(default = "StackedCardsPreset::default_card")]
    pub card_selector: String,
    #[serde(default = "StackedCardsPreset::default_image")]
    pub image_selector: String,
    #[serde(default = "StackedCardsPreset::default_text")]
    pub text_selector: String,
    #[serde(default = "StackedCardsPreset::default_reveal_start")]
    pub reveal_start: ZoneEdge,
}

impl StackedCardsPreset {
    pub fn new(root: ElementId) -> Self {
        Self {
            root,
            card_selector: Self::default_card(),
            image_selector: Self::default_image(),
            text_selector: Self::default_text(),
            reveal_start: Self::default_reveal_start(),
        }
    }

    fn default_card() -> String {
        ".stacked-card".into()
    }

    fn default_image() -> String {
        ".card__image".into()
    }

    fn default_text() -> String {
        ".card__text-item".into()
    }

    fn default_reveal_start() -> ZoneEdge {
        edge(Anchor::Top, 0.0, Anchor::Center, 100.0)
    }
}

#[derive(Clone, Debug)]
pub struct StackedCardsSection {
    preset: StackedCardsPreset,
}

impl StackedCardsSection {
    pub fn new(preset: StackedCardsPreset) -> Self {
        Self { preset }
    }

    pub fn from_json(json: &str) -> Result<Self, RevealError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    fn image_reveal(images: Vec<ElementId>) -> Tween {
        Tween::new(
            images,
            TweenSpec::new(vec![PropertyRange::new(Property::ClipInsetTop, 100.0, 0.0)], 1.5)
                .with_ease(Ease::Power(3, Direction::Out)),
        )
    }

    fn text_reveal(texts: Vec<ElementId>) -> Tween {
        Tween::new(
            texts,
            TweenSpec::new(
                vec![
                    PropertyRange::new(Property::Opacity, 0.0, 1.0),
                    PropertyRange::new(Property::TranslateY, 30.0, 0.0),
                ],
                1.0,
            )
            .with_stagger(0.15)
            .with_delay(0.3)
            .with_ease(Ease::Power(3, Direction::Out)),
        )
    }
}

impl Section for StackedCardsSection {
    fn root(&self) -> ElementId {
        self.preset.root
    }

    fn register(&self, scope: &mut Scope<'_>, _mode: LayoutMode) -> Result<(), RevealError> {
        let p = &self.preset;
        let stack = *scope.stack();
        let root = scope.root();
        let cards = scope.query(&p.card_selector)?;
        let count = cards.len();

        for (i, &card) in cards.iter().enumerate() {
            // later cards pin a little earlier so they settle on top of the previous one
            let start = edge(
                Anchor::Top,
                -(i as f32) * stack.offset_step_px,
                Anchor::Top,
                stack.pin_top_px,
            );
            let shrink = Tween::new(
                vec![card],
                TweenSpec::new(
                    vec![PropertyRange::new(Property::Scale, 1.0, stack.scale_for(i, count))],
                    1.0,
                )
                .with_ease(Ease::Linear),
            );
            scope.register(
                TriggerSpec::scrub(card, start, ZoneEdge::new(Anchor::Bottom, Anchor::Bottom))
                    .with_end_anchor(root)
                    .with_tween(shrink)
                    .pinned(),
            )?;

            let images = scope.query_in(card, &p.image_selector)?;
            let texts = scope.query_in(card, &p.text_selector)?;
            let mut reveal = TriggerSpec::one_shot(card, p.reveal_start);
            if !images.is_empty() {
                reveal = reveal.with_tween(Self::image_reveal(images));
            }
            if !texts.is_empty() {
                reveal = reveal.with_tween(Self::text_reveal(texts));
            }
            if !reveal.tweens.is_empty() {
                scope.register(reveal)?;
            }
        }
        Ok(())
    }
}

// ---------- gallery ----------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GalleryPreset {
    pub root: ElementId,
    pub metrics: GridMetrics,
    pub item_count: usize,
    #[serde(default = "GalleryPreset::default_grid_item")]
    pub grid_item_selector: String,
    #[serde(default = "GalleryPreset::default_carousel_item")]
    pub carousel_item_selector: String,
    #[serde(default = "GalleryPreset::default_pin_start")]
    pub pin_start: ZoneEdge,
    #[serde(default = "GalleryPreset::default_pin_end")]
    pub pin_end: ZoneEdge,
    /// Scrubbed across the grid items while the section is pinned.
    #[serde(default = "GalleryPreset::default_grid_tween")]
    pub grid_tween: TweenSpec,
    /// Played on the visible carousel item after each navigation.
    #[serde(default = "GalleryPreset::default_fade")]
    pub fade: TweenSpec,
}

impl GalleryPreset {
    pub fn new(root: ElementId, metrics: GridMetrics, item_count: usize) -> Self {
        Self {
            root,
            metrics,
            item_count,
            grid_item_selector: Self::default_grid_item(),
            carousel_item_selector: Self::default_carousel_item(),
            pin_start: Self::default_pin_start(),
            pin_end: Self::default_pin_end(),
            grid_tween: Self::default_grid_tween(),
            fade: Self::default_fade(),
        }
    }

    fn default_grid_item() -> String {
        ".grid-item".into()
    }

    fn default_carousel_item() -> String {
        ".carousel-item".into()
    }

    fn default_pin_start() -> ZoneEdge {
        ZoneEdge::new(Anchor::Top, Anchor::Top)
    }

    fn default_pin_end() -> ZoneEdge {
        ZoneEdge::new(Anchor::Bottom, Anchor::Top)
    }

    fn default_grid_tween() -> TweenSpec {
        TweenSpec::new(vec![PropertyRange::new(Property::TranslateY, 40.0, 0.0)], 1.0)
            .with_stagger(0.1)
            .with_ease(Ease::Linear)
    }

    fn default_fade() -> TweenSpec {
        TweenSpec::new(vec![PropertyRange::new(Property::Opacity, 0.0, 1.0)], 0.4)
            .with_ease(Ease::Power(2, Direction::Out))
    }
}

#[derive(Clone, Debug)]
pub struct GallerySection {
    preset: GalleryPreset,
}

impl GallerySection {
    pub fn new(preset: GalleryPreset) -> Self {
        Self { preset }
    }

    pub fn from_json(json: &str) -> Result<Self, RevealError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

impl Section for GallerySection {
    fn root(&self) -> ElementId {
        self.preset.root
    }

    fn layout(&self) -> Option<(GridMetrics, usize)> {
        Some((self.preset.metrics, self.preset.item_count))
    }

    fn register(&self, scope: &mut Scope<'_>, mode: LayoutMode) -> Result<(), RevealError> {
        let p = &self.preset;
        match mode {
            LayoutMode::Grid => {
                let items = scope.query(&p.grid_item_selector)?;
                if items.is_empty() {
                    return Ok(());
                }
                let root = scope.root();
                scope.register(
                    TriggerSpec::scrub(root, p.pin_start, p.pin_end)
                        .with_tween(Tween::new(items, p.grid_tween.clone()))
                        .pinned(),
                )?;
            }
            // navigation fades only; nothing is bound to scroll
            LayoutMode::Carousel => {}
        }
        Ok(())
    }

    fn navigate(&self, scope: &mut Scope<'_>, index: usize) -> Result<(), RevealError> {
        let items = scope.query(&self.preset.carousel_item_selector)?;
        // markup may render every slide or only the visible one
        if let Some(&item) = items.get(index).or_else(|| items.first()) {
            scope.animate(vec![item], self.preset.fade.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_preset_fills_defaults() {
        let json = r#"{
            "root": 10,
            "groups": [
                { "selector": ".goal-card", "tween": {
                    "props": [{ "property": "opacity", "from": 0, "to": 1 }],
                    "duration": 0.8, "stagger": 0.2, "ease": "power2.out" } }
            ]
        }"#;
        let section = RevealSection::from_json(json).unwrap();
        let p = section.preset();
        assert_eq!(p.start.to_string(), "top 70%");
        assert_eq!(p.toggle_actions.to_string(), "play none none reverse");
        assert!(!p.once);
        assert_eq!(p.groups[0].tween.stagger, 0.2);
        assert_eq!(section.root(), ElementId(10));
        assert!(section.layout().is_none());
    }

    #[test]
    fn stacked_reveal_starts_below_center() {
        let p = StackedCardsPreset::new(ElementId(1));
        assert_eq!(p.reveal_start.to_string(), "top center+=100");
    }

    #[test]
    fn gallery_reports_layout() {
        let metrics = GridMetrics {
            columns: 5,
            item_width: 256.0,
            gap: 24.0,
            padding: 40.0,
        };
        let g = GallerySection::new(GalleryPreset::new(ElementId(3), metrics, 14));
        assert_eq!(g.layout(), Some((metrics, 14)));
    }

    #[test]
    fn unknown_easing_in_preset_is_rejected() {
        let json = r#"{ "root": 1, "groups": [{ "selector": ".x", "tween": {
            "props": [], "ease": "bounce.wobble" } }] }"#;
        assert!(matches!(
            RevealSection::from_json(json),
            Err(RevealError::Serialization { .. })
        ));
    }
}
