use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use super::Renderer;

/// [`Renderer`] over a tile's `<canvas>` 2D context.
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }

    pub fn from_canvas(canvas: &HtmlCanvasElement) -> Option<Self> {
        canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
            .map(Self::new)
    }
}

impl Renderer for CanvasSurface {
    type Image = HtmlImageElement;

    fn clear(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.clear_rect(x, y, w, h);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(x, y, w, h);
    }

    fn draw_image(&mut self, image: &HtmlImageElement, x: f64, y: f64, w: f64, h: f64) {
        // A decode failure after onload leaves the placeholder visible.
        let _ = self
            .ctx
            .draw_image_with_html_image_element_and_dw_and_dh(image, x, y, w, h);
    }
}
