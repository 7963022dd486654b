use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, HtmlImageElement, MouseEvent, PointerEvent, TouchEvent, WheelEvent};

use tilepaint_shared::PaintQuery;

use crate::api::{fetch_paint, post_paint};
use crate::config::{MapConfig, TileProvider};
use crate::engine::{CellToggle, MapState, PAINT_HINT};
use crate::interaction::Gesture;
use crate::paint::Toggle;
use crate::projection::TileCoordinate;
use crate::render_loop::RedrawScheduler;
use crate::renderer::fill_cell;
use crate::tiles::{ImageState, TileLayer, load_tile_image};
use crate::viewport::{ScreenSize, ViewState};

const HINT_VISIBLE_MS: u32 = 2_500;

/// Reactive outputs of the map.
#[derive(Clone, Copy)]
pub struct MapSignals {
    pub view: RwSignal<ViewState>,
    pub selection_count: RwSignal<usize>,
    pub hint: RwSignal<Option<String>>,
}

/// Shared handle to the map engine. Clones refer to the same map.
#[derive(Clone)]
pub struct MapHandle {
    inner: Rc<MapInner>,
}

struct MapInner {
    state: RefCell<MapState>,
    provider: Cell<TileProvider>,
    root: RefCell<Option<HtmlElement>>,
    layer: RefCell<Option<TileLayer>>,
    scheduler: RefCell<Option<RedrawScheduler>>,
    resize_listener: RefCell<Option<Closure<dyn Fn()>>>,
    signals: MapSignals,
}

impl Drop for MapInner {
    fn drop(&mut self) {
        if let Some(layer) = self.layer.get_mut().as_mut() {
            layer.clear();
        }
        let listener = self.resize_listener.get_mut().take();
        if let (Some(window), Some(cb)) = (web_sys::window(), listener) {
            let _ =
                window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
        }
    }
}

impl MapHandle {
    pub fn new(config: MapConfig, signals: MapSignals) -> Self {
        let provider = config.tile_provider;
        let state = MapState::new(config);
        signals.view.set(state.view);
        Self {
            inner: Rc::new(MapInner {
                state: RefCell::new(state),
                provider: Cell::new(provider),
                root: RefCell::new(None),
                layer: RefCell::new(None),
                scheduler: RefCell::new(None),
                resize_listener: RefCell::new(None),
                signals,
            }),
        }
    }

    fn from_inner(inner: Rc<MapInner>) -> Self {
        Self { inner }
    }

    /// Bind to the mounted DOM and draw the first frame. Later calls are ignored.
    pub fn attach(&self, root: HtmlElement, tile_container: HtmlElement) {
        if self.inner.layer.borrow().is_some() {
            return;
        }
        let (tile_size, interval) = {
            let state = self.inner.state.borrow();
            (state.config.tile_size, state.config.redraw_min_interval_ms)
        };
        let Some(layer) = TileLayer::new(tile_container, tile_size) else {
            web_sys::console::error_1(&"tile layer: no document".into());
            return;
        };
        *self.inner.root.borrow_mut() = Some(root);
        *self.inner.layer.borrow_mut() = Some(layer);

        let weak = Rc::downgrade(&self.inner);
        let scheduler = RedrawScheduler::new(interval, move || {
            if let Some(inner) = weak.upgrade() {
                MapHandle::from_inner(inner).redraw();
            }
        });
        *self.inner.scheduler.borrow_mut() = Some(scheduler);

        self.listen_for_resize();
        self.draw_map();
    }

    fn listen_for_resize(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let weak = Rc::downgrade(&self.inner);
        let cb = Closure::<dyn Fn()>::new(move || {
            if let Some(inner) = weak.upgrade() {
                MapHandle::from_inner(inner).request_redraw();
            }
        });
        if window
            .add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref())
            .is_ok()
        {
            *self.inner.resize_listener.borrow_mut() = Some(cb);
        }
    }

    pub fn selection_count(&self) -> usize {
        self.inner.state.borrow().selections.len()
    }

    pub fn set_color(&self, color: &str) {
        self.inner.state.borrow_mut().color = color.to_string();
    }

    pub fn set_user_id(&self, user_id: Option<String>) {
        self.inner.state.borrow_mut().user_id = user_id;
    }

    pub fn set_provider(&self, provider: TileProvider) {
        if self.inner.provider.replace(provider) == provider {
            return;
        }
        if let Some(layer) = self.inner.layer.borrow_mut().as_mut() {
            layer.reset_images();
        }
        self.draw_map();
    }

    /// Step the zoom around the screen center and redraw.
    pub fn zoom_by(&self, step: f64) {
        self.inner.state.borrow_mut().step_zoom(step);
        self.draw_map();
    }

    /// Redraw now, cancelling any scheduled redraw.
    pub fn draw_map(&self) {
        let scheduler = self.inner.scheduler.borrow().clone();
        match scheduler {
            Some(scheduler) => scheduler.force(),
            None => self.redraw(),
        }
    }

    pub fn request_redraw(&self) {
        let scheduler = self.inner.scheduler.borrow().clone();
        if let Some(scheduler) = scheduler {
            scheduler.request();
        }
    }

    fn refresh_screen(&self) {
        let Some(root) = self.inner.root.borrow().clone() else {
            return;
        };
        let screen = ScreenSize::new(root.client_width() as f64, root.client_height() as f64);
        self.inner.state.borrow_mut().screen = screen;
    }

    fn redraw(&self) {
        self.refresh_screen();
        let provider = self.inner.provider.get();
        let mut loads = Vec::new();

        let (fetches, view) = {
            let mut state = self.inner.state.borrow_mut();
            let grid = state.grid();
            if let Some(layer) = self.inner.layer.borrow_mut().as_mut() {
                layer.begin_frame(&grid);
                let generation = layer.generation();
                let layers = state.layers();
                for placed in grid.iter() {
                    let source = state.source_tile(placed.tile);
                    let Some(slot) = layer.slot_mut(&placed, source) else {
                        continue;
                    };
                    layers.draw_initial(&mut slot.surface, source);
                    match slot.image {
                        ImageState::Loaded(ref image) => {
                            layers.draw_loaded(&mut slot.surface, source, image);
                        }
                        ImageState::Idle => {
                            if let Some(tile) = source {
                                slot.image = ImageState::Loading { generation };
                                let url = provider.tile_url(tile.zoom, tile.x, tile.y);
                                loads.push((placed.tile, url, generation));
                            }
                        }
                        ImageState::Loading { .. } | ImageState::Failed => {}
                    }
                }
            }
            (state.claim_paint_fetches(&grid), state.view)
        };

        self.inner.signals.view.set(view);
        for (layout, url, generation) in loads {
            self.load_image(layout, &url, generation);
        }
        for tile in fetches {
            self.fetch_paint_for(tile);
        }
    }

    fn load_image(&self, layout: TileCoordinate, url: &str, generation: u64) {
        let weak = Rc::downgrade(&self.inner);
        load_tile_image(
            url,
            Rc::new(move |image| {
                if let Some(inner) = weak.upgrade() {
                    MapHandle::from_inner(inner).image_ready(layout, generation, image);
                }
            }),
        );
    }

    fn image_ready(
        &self,
        layout: TileCoordinate,
        generation: u64,
        image: Option<HtmlImageElement>,
    ) {
        let state = self.inner.state.borrow();
        let mut layer = self.inner.layer.borrow_mut();
        let Some(slot) = layer.as_mut().and_then(|layer| layer.get_mut(layout)) else {
            return;
        };
        if !matches!(slot.image, ImageState::Loading { generation: g } if g == generation) {
            return;
        }
        match image {
            Some(image) => {
                state.layers().draw_loaded(&mut slot.surface, slot.source, &image);
                slot.image = ImageState::Loaded(image);
            }
            None => {
                web_sys::console::warn_1(
                    &format!("tile image failed: {}", layout.canvas_id()).into(),
                );
                slot.image = ImageState::Failed;
            }
        }
    }

    /// Repaint every canvas showing `tile` from scratch.
    fn redraw_tile(&self, tile: TileCoordinate) {
        let state = self.inner.state.borrow();
        let mut layer = self.inner.layer.borrow_mut();
        let Some(layer) = layer.as_mut() else {
            return;
        };
        let layers = state.layers();
        for slot in layer.slots_for_source(tile) {
            layers.draw_initial(&mut slot.surface, slot.source);
            if let ImageState::Loaded(ref image) = slot.image {
                layers.draw_loaded(&mut slot.surface, slot.source, image);
            }
        }
    }

    fn fetch_paint_for(&self, tile: TileCoordinate) {
        let url = self.inner.state.borrow().config.paint_url();
        let query = PaintQuery {
            zoom: tile.zoom,
            tile_x: tile.x,
            tile_y: tile.y,
        };
        let handle = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match fetch_paint(&url, query).await {
                Ok(body) => {
                    handle.inner.state.borrow_mut().cache.complete_fetch(tile, body.cells);
                    handle.redraw_tile(tile);
                }
                Err(e) => {
                    web_sys::console::warn_1(
                        &format!("paint fetch failed for {}: {e}", query.to_query_string()).into(),
                    );
                    handle.inner.state.borrow_mut().cache.fail_fetch(tile);
                }
            }
        });
    }

    fn handle_click(&self, x: f64, y: f64) {
        let outcome = self.inner.state.borrow_mut().toggle_at(x, y);
        match outcome {
            CellToggle::Changed {
                key,
                toggle: Toggle::Selected,
            } => {
                let state = self.inner.state.borrow();
                let cell_size = state.config.cell_pixel_size();
                if let Some(layer) = self.inner.layer.borrow_mut().as_mut() {
                    for slot in layer.slots_for_source(key.tile()) {
                        fill_cell(
                            &mut slot.surface,
                            key.cell_x,
                            key.cell_y,
                            cell_size,
                            &state.color,
                        );
                    }
                }
                drop(state);
                self.notify_selection();
            }
            CellToggle::Changed {
                key,
                toggle: Toggle::Deselected,
            } => {
                self.redraw_tile(key.tile());
                self.notify_selection();
            }
            CellToggle::BelowPaintZoom => self.show_hint(PAINT_HINT),
            CellToggle::OutsideWorld => {}
        }
    }

    fn show_hint(&self, message: &str) {
        web_sys::console::info_1(&message.into());
        let hint = self.inner.signals.hint;
        hint.set(Some(message.to_string()));
        let ticket = self.inner.state.borrow_mut().hints.issue();
        let weak = Rc::downgrade(&self.inner);
        Timeout::new(HINT_VISIBLE_MS, move || {
            let current = weak
                .upgrade()
                .is_some_and(|inner| inner.state.borrow().hints.is_current(ticket));
            if current {
                hint.set(None);
            }
        })
        .forget();
    }

    fn notify_selection(&self) {
        let count = self.selection_count();
        self.inner.signals.selection_count.set(count);
    }

    /// Submit pending selections, one POST per tile, then clear and redraw.
    pub fn commit_selection(&self) {
        let prepared = {
            let mut state = self.inner.state.borrow_mut();
            state
                .prepare_commit()
                .map(|batches| (batches, state.config.paint_url()))
        };
        let (batches, url) = match prepared {
            Ok((batches, _)) if batches.is_empty() => return,
            Ok(prepared) => prepared,
            Err(e) => {
                web_sys::console::error_1(&format!("commit aborted: {e}").into());
                return;
            }
        };

        for batch in batches {
            let handle = self.clone();
            let url = url.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let tile = TileCoordinate::new(batch.zoom, batch.tile_x, batch.tile_y);
                match post_paint(&url, &batch).await {
                    Ok(()) => {
                        let cells = batch.cells.len();
                        web_sys::console::info_1(
                            &format!("committed {cells} cells on {}", tile.canvas_id()).into(),
                        );
                        handle.inner.state.borrow_mut().cache.invalidate(tile);
                        handle.request_redraw();
                    }
                    Err(e) => {
                        web_sys::console::warn_1(
                            &format!("commit failed for {}: {e}", tile.canvas_id()).into(),
                        );
                        let restored = handle.inner.state.borrow_mut().commit_failed(&batch);
                        if restored {
                            handle.notify_selection();
                            handle.redraw_tile(tile);
                        }
                    }
                }
            });
        }

        self.notify_selection();
        self.draw_map();
    }

    fn set_cursor(&self, cursor: &str) {
        if let Some(root) = self.inner.root.borrow().as_ref() {
            let _ = root.style().set_property("cursor", cursor);
        }
    }

    /// Pointer position relative to the map root.
    fn local(&self, client_x: f64, client_y: f64) -> (f64, f64) {
        match self.inner.root.borrow().as_ref() {
            Some(root) => {
                let rect = root.get_bounding_client_rect();
                (client_x - rect.left(), client_y - rect.top())
            }
            None => (client_x, client_y),
        }
    }

    fn apply(&self, gesture: Gesture) {
        match gesture {
            Gesture::Panned | Gesture::Zoomed => self.request_redraw(),
            Gesture::Click { x, y } => self.handle_click(x, y),
            Gesture::PanEnded | Gesture::None => {}
        }
    }

    fn on_pointer_down(&self, e: &PointerEvent) {
        if e.button() != 0 {
            return;
        }
        let (x, y) = self.local(e.client_x() as f64, e.client_y() as f64);
        self.inner.state.borrow_mut().pointer_down(x, y);
        if let Some(target) = e.target()
            && let Ok(el) = target.dyn_into::<HtmlElement>()
        {
            el.set_pointer_capture(e.pointer_id()).ok();
        }
        self.set_cursor("grabbing");
    }

    fn on_pointer_move(&self, e: &PointerEvent) {
        let (x, y) = self.local(e.client_x() as f64, e.client_y() as f64);
        let gesture = self.inner.state.borrow_mut().pointer_move(x, y);
        self.apply(gesture);
    }

    fn on_pointer_up(&self, e: &PointerEvent, leaving: bool) {
        let (x, y) = self.local(e.client_x() as f64, e.client_y() as f64);
        let gesture = {
            let mut state = self.inner.state.borrow_mut();
            if leaving {
                state.pointer_leave(x, y)
            } else {
                state.pointer_up(x, y)
            }
        };
        self.set_cursor("grab");
        if matches!(gesture, Gesture::Click { .. }) {
            // The center snapped back to where the press started.
            self.request_redraw();
        }
        self.apply(gesture);
    }

    fn on_wheel(&self, e: &WheelEvent) {
        e.prevent_default();
        self.refresh_screen();
        let (x, y) = self.local(e.client_x() as f64, e.client_y() as f64);
        let gesture = self.inner.state.borrow_mut().wheel(e.delta_y(), x, y);
        self.apply(gesture);
    }

    fn on_touch(&self, e: &TouchEvent) {
        let touches = e.touches();
        if touches.length() != 2 {
            self.inner.state.borrow_mut().pinch_end();
            return;
        }
        e.prevent_default();
        let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
            return;
        };
        let dx = (t1.client_x() - t0.client_x()) as f64;
        let dy = (t1.client_y() - t0.client_y()) as f64;
        let distance = (dx * dx + dy * dy).sqrt();
        if e.type_() == "touchstart" {
            self.inner.state.borrow_mut().pinch_start(distance);
            self.set_cursor("grab");
            return;
        }
        let (mid_x, mid_y) = self.local(
            (t0.client_x() + t1.client_x()) as f64 / 2.0,
            (t0.client_y() + t1.client_y()) as f64 / 2.0,
        );
        self.refresh_screen();
        let gesture = self.inner.state.borrow_mut().pinch_move(distance, mid_x, mid_y);
        self.apply(gesture);
    }
}

/// The slippy map: a pointer-capturing root and a scaled container of tile canvases.
#[component]
pub fn MapCanvas(handle: MapHandle) -> impl IntoView {
    let root_ref = NodeRef::<leptos::html::Div>::new();
    let tiles_ref = NodeRef::<leptos::html::Div>::new();

    Effect::new({
        let handle = handle.clone();
        move || {
            let (Some(root), Some(tiles)) = (root_ref.get(), tiles_ref.get()) else {
                return;
            };
            handle.attach(root.into(), tiles.into());
        }
    });

    let on_pointer_down = {
        let handle = handle.clone();
        move |e: PointerEvent| handle.on_pointer_down(&e)
    };
    let on_pointer_move = {
        let handle = handle.clone();
        move |e: PointerEvent| handle.on_pointer_move(&e)
    };
    let on_pointer_up = {
        let handle = handle.clone();
        move |e: PointerEvent| handle.on_pointer_up(&e, false)
    };
    let on_pointer_leave = {
        let handle = handle.clone();
        move |e: PointerEvent| handle.on_pointer_up(&e, true)
    };
    let on_wheel = {
        let handle = handle.clone();
        move |e: WheelEvent| handle.on_wheel(&e)
    };
    let on_touch_start = {
        let handle = handle.clone();
        move |e: TouchEvent| handle.on_touch(&e)
    };
    let on_touch_move = {
        let handle = handle.clone();
        move |e: TouchEvent| handle.on_touch(&e)
    };
    let on_touch_end = {
        let handle = handle.clone();
        move |e: TouchEvent| handle.on_touch(&e)
    };
    let on_context_menu = |e: MouseEvent| e.prevent_default();

    view! {
        <div
            node_ref=root_ref
            style="position: relative; width: 100%; height: 100%; overflow: hidden; touch-action: none; cursor: grab; background: #f2f2f2;"
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:wheel=on_wheel
            on:touchstart=on_touch_start
            on:touchmove=on_touch_move
            on:touchend=on_touch_end
            on:contextmenu=on_context_menu
        >
            <div node_ref=tiles_ref></div>
        </div>
    }
}
