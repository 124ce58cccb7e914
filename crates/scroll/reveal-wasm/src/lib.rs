use std::fmt::Display;

use js_sys::Function;
use serde::Serialize;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;

use reveal_core::{
    Bounds, CarouselState, Config, ContainerId, ElementId, ElementSpec, GalleryPreset,
    GallerySection, Host, LayoutMode, MediaQuery, MemoryDocument, RevealPreset, RevealSection,
    Selector, StackedCardsPreset, StackedCardsSection, Stage, SubscriptionId, Viewport,
};

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn js_err(what: &str, e: impl Display) -> JsError {
    JsError::new(&format!("{what}: {e}"))
}

/// Mirrors DOM geometry pushed from JS. Layout rebuilds ask the optional JS
/// callback for the new subtree: `rebuild(root, mode, index) -> ElementSpec[]`.
struct JsHost {
    doc: MemoryDocument,
    on_rebuild: Option<Function>,
}

impl JsHost {
    fn rebuilt_children(
        &self,
        root: ElementId,
        mode: LayoutMode,
        carousel: Option<&CarouselState>,
    ) -> Option<Vec<ElementSpec>> {
        let f = self.on_rebuild.as_ref()?;
        let mode_js = swb::to_value(&mode).ok()?;
        let index = carousel
            .map(|c| JsValue::from(c.current_index() as u32))
            .unwrap_or(JsValue::NULL);
        let out = match f.call3(&JsValue::UNDEFINED, &JsValue::from(root.0), &mode_js, &index) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("rebuild callback threw for {root:?}: {e:?}");
                return None;
            }
        };
        if jsvalue_is_undefined_or_null(&out) {
            return None;
        }
        match swb::from_value(out) {
            Ok(children) => Some(children),
            Err(e) => {
                log::warn!("rebuild callback returned malformed elements for {root:?}: {e}");
                None
            }
        }
    }
}

impl Host for JsHost {
    fn is_attached(&self, el: ElementId) -> bool {
        self.doc.is_attached(el)
    }

    fn bounds(&self, el: ElementId) -> Option<Bounds> {
        self.doc.bounds(el)
    }

    fn contains(&self, root: ElementId, el: ElementId) -> bool {
        self.doc.contains(root, el)
    }

    fn query(&self, root: ElementId, selector: &Selector) -> Vec<ElementId> {
        self.doc.query(root, selector)
    }

    fn rebuild(&mut self, root: ElementId, mode: LayoutMode, carousel: Option<&CarouselState>) {
        if let Some(children) = self.rebuilt_children(root, mode, carousel) {
            self.doc.set_template(root, mode, children);
        }
        self.doc.rebuild(root, mode, carousel);
    }
}

#[wasm_bindgen]
pub struct RevealStage {
    core: Stage<JsHost>,
}

#[wasm_bindgen]
impl RevealStage {
    /// Create a stage for a viewport of `width` x `height` CSS pixels.
    /// `config` is a (partial) JSON config object, or undefined/null for defaults.
    /// Example:
    ///   new RevealStage({ settle_delay_ms: 50 }, innerWidth, innerHeight)
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, width: f32, height: f32) -> Result<RevealStage, JsError> {
        console_error_panic_hook::set_once();

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| js_err("config error", e))?
        };
        let host = JsHost {
            doc: MemoryDocument::new(),
            on_rebuild: None,
        };
        Ok(RevealStage {
            core: Stage::new(cfg, host, Viewport::new(width, height)),
        })
    }

    /// Register `rebuild(root: number, mode: "Grid" | "Carousel", index: number | null)`.
    /// It should return the new children of `root` as element specs, or null to keep
    /// the current subtree.
    #[wasm_bindgen(js_name = set_rebuild_callback)]
    pub fn set_rebuild_callback(&mut self, f: Function) {
        self.core.host_mut().on_rebuild = Some(f);
    }

    // ---------- document mirror ----------

    /// Insert or update elements: `[{ id, parent?, tag?, classes?, bounds: { top, height, width? } }]`.
    /// Updating an element keeps its children; children may arrive before their parent.
    #[wasm_bindgen(js_name = upsert_elements)]
    pub fn upsert_elements(&mut self, elements: JsValue) -> Result<(), JsError> {
        let specs: Vec<ElementSpec> =
            swb::from_value(elements).map_err(|e| js_err("upsert_elements parse error", e))?;
        let doc = &mut self.core.host_mut().doc;
        for spec in specs {
            doc.insert(spec);
        }
        Ok(())
    }

    #[wasm_bindgen(js_name = remove_element)]
    pub fn remove_element(&mut self, id: u32) {
        self.core.host_mut().doc.remove(ElementId(id));
    }

    /// Update one element's geometry. Returns false for unknown ids.
    /// Call `refresh()` once a batch of updates is done.
    #[wasm_bindgen(js_name = set_bounds)]
    pub fn set_bounds(&mut self, id: u32, top: f32, height: f32, width: f32) -> bool {
        self.core
            .host_mut()
            .doc
            .set_bounds(ElementId(id), Bounds { top, height, width })
    }

    /// Static alternative to the rebuild callback.
    #[wasm_bindgen(js_name = set_template)]
    pub fn set_template(&mut self, root: u32, mode: JsValue, children: JsValue) -> Result<(), JsError> {
        let mode: LayoutMode = swb::from_value(mode).map_err(|e| js_err("template mode error", e))?;
        let children: Vec<ElementSpec> =
            swb::from_value(children).map_err(|e| js_err("template parse error", e))?;
        self.core
            .host_mut()
            .doc
            .set_template(ElementId(root), mode, children);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn refresh(&mut self) {
        self.core.refresh();
    }

    // ---------- sections ----------

    /// Mount a reveal section from a preset object. Returns the container id.
    #[wasm_bindgen(js_name = mount_reveal)]
    pub fn mount_reveal(&mut self, preset: JsValue) -> Result<u32, JsError> {
        let preset: RevealPreset =
            swb::from_value(preset).map_err(|e| js_err("reveal preset error", e))?;
        let id = self
            .core
            .mount(RevealSection::new(preset))
            .map_err(|e| js_err("mount_reveal", e))?;
        Ok(id.0)
    }

    #[wasm_bindgen(js_name = mount_stacked_cards)]
    pub fn mount_stacked_cards(&mut self, preset: JsValue) -> Result<u32, JsError> {
        let preset: StackedCardsPreset =
            swb::from_value(preset).map_err(|e| js_err("stacked cards preset error", e))?;
        let id = self
            .core
            .mount(StackedCardsSection::new(preset))
            .map_err(|e| js_err("mount_stacked_cards", e))?;
        Ok(id.0)
    }

    #[wasm_bindgen(js_name = mount_gallery)]
    pub fn mount_gallery(&mut self, preset: JsValue) -> Result<u32, JsError> {
        let preset: GalleryPreset =
            swb::from_value(preset).map_err(|e| js_err("gallery preset error", e))?;
        let id = self
            .core
            .mount(GallerySection::new(preset))
            .map_err(|e| js_err("mount_gallery", e))?;
        Ok(id.0)
    }

    /// Tear a section down. Safe to call twice; the second call returns false.
    #[wasm_bindgen]
    pub fn unmount(&mut self, container: u32) -> bool {
        self.core.unmount(ContainerId(container))
    }

    /// Current layout mode of a gallery container ("Grid" / "Carousel"), or undefined.
    #[wasm_bindgen(js_name = layout_mode)]
    pub fn layout_mode(&self, container: u32) -> Result<JsValue, JsError> {
        match self.core.layout_mode(ContainerId(container)) {
            Some(mode) => swb::to_value(&mode).map_err(|e| js_err("layout mode error", e)),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    #[wasm_bindgen(js_name = carousel_index)]
    pub fn carousel_index(&self, container: u32) -> Option<u32> {
        self.core
            .carousel(ContainerId(container))
            .map(|c| c.current_index() as u32)
    }

    #[wasm_bindgen(js_name = carousel_next)]
    pub fn carousel_next(&mut self, container: u32) -> Result<u32, JsError> {
        self.core
            .carousel_next(ContainerId(container))
            .map(|i| i as u32)
            .map_err(|e| js_err("carousel_next", e))
    }

    #[wasm_bindgen(js_name = carousel_previous)]
    pub fn carousel_previous(&mut self, container: u32) -> Result<u32, JsError> {
        self.core
            .carousel_previous(ContainerId(container))
            .map(|i| i as u32)
            .map_err(|e| js_err("carousel_previous", e))
    }

    // ---------- viewport / scroll ----------

    #[wasm_bindgen]
    pub fn resize(&mut self, width: f32, height: f32, device_pixel_ratio: f32) {
        self.core.resize(Viewport {
            width,
            height,
            device_pixel_ratio,
        });
    }

    /// Breakpoint state as `{ bucket, orientation }`.
    #[wasm_bindgen]
    pub fn breakpoint(&self) -> Result<JsValue, JsError> {
        swb::to_value(&self.core.breakpoint()).map_err(|e| js_err("breakpoint error", e))
    }

    /// Subscribe to a media query such as `"(max-width: 768px)"`. Changes arrive as
    /// `MediaChanged` events in later frames. Returns the subscription id.
    #[wasm_bindgen(js_name = subscribe_media)]
    pub fn subscribe_media(&mut self, query: String) -> Result<u32, JsError> {
        let query: MediaQuery = query.parse().map_err(|e| js_err("media query error", e))?;
        let (_, id) = self.core.breakpoints_mut().subscribe(query);
        Ok(id.0)
    }

    #[wasm_bindgen(js_name = media_matches)]
    pub fn media_matches(&mut self, id: u32) -> Option<bool> {
        self.core.breakpoints_mut().matches(SubscriptionId(id))
    }

    #[wasm_bindgen(js_name = unsubscribe_media)]
    pub fn unsubscribe_media(&mut self, id: u32) -> bool {
        self.core.breakpoints_mut().unsubscribe(SubscriptionId(id))
    }

    /// Report the native scroll offset.
    #[wasm_bindgen]
    pub fn scroll(&mut self, offset: f32) {
        self.core.scroll_to(offset);
    }

    #[wasm_bindgen(js_name = start_smooth_scroll)]
    pub fn start_smooth_scroll(&mut self, wrapper: u32, content: u32) -> Result<(), JsError> {
        self.core
            .start_smooth_scroll(ElementId(wrapper), ElementId(content))
            .map_err(|e| js_err("start_smooth_scroll", e))
    }

    #[wasm_bindgen(js_name = stop_smooth_scroll)]
    pub fn stop_smooth_scroll(&mut self) -> Result<(), JsError> {
        self.core
            .stop_smooth_scroll()
            .map_err(|e| js_err("stop_smooth_scroll", e))
    }

    /// Offset trigger zones are measured against (virtual while smoothing).
    #[wasm_bindgen(js_name = scroll_offset)]
    pub fn scroll_offset(&self) -> f32 {
        self.core.scroll_offset()
    }

    // ---------- frame ----------

    /// Advance to `now_ms` (e.g. the rAF timestamp). Returns the Frame JSON:
    /// `{ epoch, now_ms, dt, scroll, writes: [{ target, property, value }], events }`.
    /// A null `value` means "restore the element's own style".
    #[wasm_bindgen]
    pub fn tick(&mut self, now_ms: f64) -> Result<JsValue, JsError> {
        let frame = self.core.tick(now_ms);
        frame
            .serialize(&swb::Serializer::json_compatible())
            .map_err(|e| js_err("frame error", e))
    }
}

/// Route `log` output to the browser console. `level` is one of
/// `error|warn|info|debug|trace`; calling it more than once is harmless.
#[wasm_bindgen(js_name = init_logging)]
pub fn init_logging(level: String) -> Result<(), JsError> {
    let level: log::Level = level.parse().map_err(|e| js_err("log level error", e))?;
    if console_log::init_with_level(level).is_err() {
        log::set_max_level(level.to_level_filter());
    }
    Ok(())
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
