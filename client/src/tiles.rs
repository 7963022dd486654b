#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::collections::HashMap;
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, HtmlCanvasElement, HtmlElement, HtmlImageElement};

use crate::projection::TileCoordinate;
use crate::renderer::canvas2d::CanvasSurface;
use crate::viewport::{PlacedTile, TileGrid};

const ONLOAD_HANDLE_KEY: &str = "__tilepaintTileOnload";
const ONERROR_HANDLE_KEY: &str = "__tilepaintTileOnerror";

pub type ImageCallback = Rc<dyn Fn(Option<HtmlImageElement>)>;

/// Background raster state of one tile canvas.
#[derive(Clone)]
pub enum ImageState {
    Idle,
    Loading { generation: u64 },
    Loaded(HtmlImageElement),
    /// Stays failed until the tile leaves the viewport.
    Failed,
}

/// One `<canvas>` in the tile container.
pub struct TileSlot {
    pub canvas: HtmlCanvasElement,
    pub surface: CanvasSurface,
    /// Real tile drawn here, `None` past the world edge.
    pub source: Option<TileCoordinate>,
    pub image: ImageState,
}

/// The absolutely-positioned tile canvases inside a CSS-scaled container.
pub struct TileLayer {
    document: Document,
    container: HtmlElement,
    tile_size: u32,
    slots: HashMap<TileCoordinate, TileSlot>,
    generation: u64,
}

impl TileLayer {
    pub fn new(container: HtmlElement, tile_size: u32) -> Option<Self> {
        let document = web_sys::window()?.document()?;
        let style = container.style();
        let _ = style.set_property("position", "absolute");
        let _ = style.set_property("left", "0");
        let _ = style.set_property("top", "0");
        let _ = style.set_property("transform-origin", "0 0");
        Some(Self {
            document,
            container,
            tile_size,
            slots: HashMap::new(),
            generation: 0,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Apply the frame's scale and drop canvases that left the grid.
    pub fn begin_frame(&mut self, grid: &TileGrid) {
        let _ = self
            .container
            .style()
            .set_property("transform", &format!("scale({})", grid.scale()));
        self.slots.retain(|tile, slot| {
            let keep = grid.contains(*tile);
            if !keep {
                slot.canvas.remove();
            }
            keep
        });
    }

    /// Canvas for a culled tile, created on first use and moved into place.
    pub fn slot_mut(
        &mut self,
        placed: &PlacedTile,
        source: Option<TileCoordinate>,
    ) -> Option<&mut TileSlot> {
        if !self.slots.contains_key(&placed.tile) {
            let slot = self.create_slot(placed.tile, source)?;
            self.slots.insert(placed.tile, slot);
        }
        let slot = self.slots.get_mut(&placed.tile)?;
        let style = slot.canvas.style();
        let _ = style.set_property("left", &format!("{}px", placed.left));
        let _ = style.set_property("top", &format!("{}px", placed.top));
        Some(slot)
    }

    pub fn get_mut(&mut self, layout: TileCoordinate) -> Option<&mut TileSlot> {
        self.slots.get_mut(&layout)
    }

    /// Every canvas currently showing `source`. Several when longitudes wrap.
    pub fn slots_for_source(
        &mut self,
        source: TileCoordinate,
    ) -> impl Iterator<Item = &mut TileSlot> {
        self.slots
            .values_mut()
            .filter(move |slot| slot.source == Some(source))
    }

    /// Forget loaded rasters, e.g. after switching tile provider.
    pub fn reset_images(&mut self) {
        self.generation += 1;
        for slot in self.slots.values_mut() {
            slot.image = ImageState::Idle;
        }
    }

    pub fn clear(&mut self) {
        for slot in self.slots.values() {
            slot.canvas.remove();
        }
        self.slots.clear();
    }

    fn create_slot(
        &self,
        layout: TileCoordinate,
        source: Option<TileCoordinate>,
    ) -> Option<TileSlot> {
        let canvas = self
            .document
            .create_element("canvas")
            .ok()?
            .dyn_into::<HtmlCanvasElement>()
            .ok()?;
        canvas.set_id(&layout.canvas_id());
        canvas.set_width(self.tile_size);
        canvas.set_height(self.tile_size);
        let style = canvas.style();
        let _ = style.set_property("position", "absolute");
        let _ = style.set_property("width", &format!("{}px", self.tile_size));
        let _ = style.set_property("height", &format!("{}px", self.tile_size));
        let _ = style.set_property("pointer-events", "none");
        let surface = CanvasSurface::from_canvas(&canvas)?;
        self.container.append_child(&canvas).ok()?;
        Some(TileSlot {
            canvas,
            surface,
            source,
            image: ImageState::Idle,
        })
    }
}

/// Load a raster; `on_done` gets the decoded image, or `None` on failure.
pub fn load_tile_image(src: &str, on_done: ImageCallback) {
    let img = match HtmlImageElement::new() {
        Ok(img) => img,
        Err(_) => {
            on_done(None);
            return;
        }
    };

    let img_for_load = img.clone();
    let on_done_load = on_done.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);

        let img_for_decode = img_for_load.clone();
        let on_done_load = on_done_load.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let _ = JsFuture::from(img_for_decode.decode()).await;
            on_done_load(Some(img_for_decode));
        });
    });

    let img_for_error = img.clone();
    let on_done_error = on_done;
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        on_done_error(None);
    });

    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONLOAD_HANDLE_KEY),
        &onload_js,
    );
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONERROR_HANDLE_KEY),
        &onerror_js,
    );
    img.set_src(src);
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}
