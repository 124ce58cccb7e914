//! Reveal Core (engine-agnostic)
//!
//! Scroll-synchronized reveal orchestration: deferred, scoped registration of
//! scroll triggers per page section, breakpoint-driven grid/carousel switching,
//! and a single smooth-scroll proxy every trigger is measured against.
//!
//! The core never touches a DOM. Hosts implement [`Host`] (or mirror geometry
//! into a [`MemoryDocument`]), drive [`Stage::tick`] once per frame and apply the
//! [`PropertyWrite`]s in the returned [`Frame`].

pub mod breakpoint;
pub mod config;
pub mod context;
pub mod document;
pub mod easing;
pub mod error;
pub mod ids;
pub mod layout;
pub mod section;
pub mod smooth;
pub mod stage;
pub mod timer;
pub mod trigger;
pub mod tween;
pub mod zone;

// Re-exports for consumers (adapters)
pub use breakpoint::{
    BreakpointMonitor, BreakpointState, Bucket, MatchChange, MediaQuery, Orientation, Viewport,
};
pub use config::{Config, SmoothScrollConfig, StackConfig};
pub use context::{AnimationContext, ContextState, Scope};
pub use document::{Bounds, ElementSpec, Host, MemoryDocument, Selector};
pub use easing::{Direction, Ease};
pub use error::RevealError;
pub use ids::{ContainerId, ContextId, ElementId, SubscriptionId, TimerId, TriggerId, TweenId};
pub use layout::{decide_mode, CarouselState, GridMetrics, LayoutMode, LayoutSwitcher};
pub use section::{
    GalleryPreset, GallerySection, HeaderBar, RevealGroup, RevealPreset, RevealSection, Section,
    StackedCardsPreset, StackedCardsSection,
};
pub use smooth::SmoothScrollHandle;
pub use stage::{Frame, Stage, StageEvent};
pub use timer::TimerQueue;
pub use trigger::{
    Crossing, ToggleAction, ToggleActions, Trigger, TriggerEvent, TriggerKind, TriggerRegistry,
    TriggerSpec,
};
pub use tween::{Property, PropertyRange, PropertyWrite, Sample, StyleCache, Timeline, Tween, TweenSpec};
pub use zone::{Anchor, ZoneEdge};
