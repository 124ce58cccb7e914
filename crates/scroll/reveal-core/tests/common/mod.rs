#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use reveal_core::{
    Config, ElementId, ElementSpec, Frame, Host, LayoutMode, MemoryDocument, Property, Stage,
    StageEvent,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct DocumentFixture {
    elements: Vec<ElementSpec>,
    #[serde(default)]
    templates: Vec<TemplateFixture>,
}

#[derive(Deserialize)]
struct TemplateFixture {
    root: ElementId,
    mode: LayoutMode,
    children: Vec<ElementSpec>,
}

pub fn load_document(name: &str) -> MemoryDocument {
    let fixture: DocumentFixture =
        reveal_test_fixtures::documents::load(name).expect("load document fixture");
    let mut doc = MemoryDocument::new();
    for el in fixture.elements {
        doc.insert(el);
    }
    for t in fixture.templates {
        doc.set_template(t.root, t.mode, t.children);
    }
    doc
}

pub fn lenient() -> Config {
    Config {
        strict_contracts: false,
        ..Config::default()
    }
}

/// Host-side view of the applied properties, fed from frame writes.
#[derive(Default, Debug)]
pub struct Applied {
    values: HashMap<(ElementId, Property), f32>,
}

impl Applied {
    pub fn apply(&mut self, frame: &Frame) {
        for w in &frame.writes {
            match w.value {
                Some(v) => {
                    self.values.insert((w.target, w.property), v);
                }
                None => {
                    self.values.remove(&(w.target, w.property));
                }
            }
        }
    }

    pub fn get(&self, el: u32, property: Property) -> Option<f32> {
        self.values.get(&(ElementId(el), property)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Tick from `from_ms` to `to_ms` inclusive in `step_ms` increments.
pub fn run<H: Host>(
    stage: &mut Stage<H>,
    applied: &mut Applied,
    from_ms: f64,
    to_ms: f64,
    step_ms: f64,
) -> Vec<StageEvent> {
    let mut events = Vec::new();
    let mut now = from_ms;
    while now <= to_ms {
        let frame = stage.tick(now);
        applied.apply(&frame);
        events.extend(frame.events);
        now += step_ms;
    }
    events
}

static SMOOTH_SCROLL: Mutex<()> = Mutex::new(());

/// The smooth-scroll proxy is process-wide, so tests that start one take turns.
pub fn smooth_scroll_serial() -> MutexGuard<'static, ()> {
    SMOOTH_SCROLL.lock().unwrap_or_else(|e| e.into_inner())
}
