//! Side-view 2D canvas renderer (wasm only)
//!
//! Projects boxes onto the x/y plane. The camera keeps the tower focus a
//! little below the top third of the canvas and eases toward it.

use std::collections::BTreeMap;

use glam::{EulerRot, Quat, Vec3};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::{BoxStyle, RenderScene, VisualHandle};
use crate::TowerError;
use crate::sim::BlockId;

/// World units visible from canvas top to bottom
const VIEW_HEIGHT_UNITS: f64 = 24.0;
/// Fraction of the canvas height above the focus point
const FOCUS_SCREEN_FRACTION: f64 = 0.4;
/// Per-frame camera easing
const CAMERA_EASE: f32 = 0.08;

struct CanvasBox {
    size: Vec3,
    style: BoxStyle,
    tag: BlockId,
    position: Vec3,
    orientation: Quat,
}

pub struct CanvasScene {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    boxes: BTreeMap<VisualHandle, CanvasBox>,
    next_handle: u32,
    camera_y: f32,
    debug_visuals: bool,
}

impl CanvasScene {
    /// Attach to a canvas element by id
    pub fn from_canvas_id(id: &str) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(id)
            .ok_or_else(|| JsValue::from_str("canvas not found"))?
            .dyn_into()?;

        let dpr = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
        canvas.set_width((canvas.client_width() as f64 * dpr) as u32);
        canvas.set_height((canvas.client_height() as f64 * dpr) as u32);

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into()?;
        Ok(Self {
            canvas,
            ctx,
            boxes: BTreeMap::new(),
            next_handle: 0,
            camera_y: 0.0,
            debug_visuals: false,
        })
    }

    fn draw_box(&self, b: &CanvasBox, scale: f64, origin: (f64, f64)) {
        let ctx = &self.ctx;
        let (_, _, angle) = b.orientation.to_euler(EulerRot::XYZ);
        let sx = origin.0 + b.position.x as f64 * scale;
        let sy = origin.1 - b.position.y as f64 * scale;
        let w = b.size.x as f64 * scale;
        let h = b.size.y as f64 * scale;

        ctx.save();
        let _ = ctx.translate(sx, sy);
        // Canvas y points down, so world rotation flips sign
        let _ = ctx.rotate(-angle as f64);
        if b.style.wireframe {
            ctx.set_stroke_style_str(&b.style.css_color());
            ctx.stroke_rect(-w / 2.0, -h / 2.0, w, h);
        } else {
            ctx.set_fill_style_str(&b.style.css_color());
            ctx.fill_rect(-w / 2.0, -h / 2.0, w, h);
        }
        if self.debug_visuals {
            ctx.set_stroke_style_str("#ff00ff");
            ctx.stroke_rect(-w / 2.0, -h / 2.0, w, h);
            ctx.set_fill_style_str("#ffffff");
            let _ = ctx.fill_text(&b.tag.0.to_string(), -w / 2.0 + 4.0, 4.0);
        }
        ctx.restore();
    }
}

impl RenderScene for CanvasScene {
    fn create_box(&mut self, size: Vec3, style: BoxStyle, tag: BlockId) -> VisualHandle {
        self.next_handle += 1;
        let handle = VisualHandle(self.next_handle);
        self.boxes.insert(
            handle,
            CanvasBox {
                size,
                style,
                tag,
                position: Vec3::ZERO,
                orientation: Quat::IDENTITY,
            },
        );
        handle
    }

    fn remove(&mut self, handle: VisualHandle) -> bool {
        self.boxes.remove(&handle).is_some()
    }

    fn set_transform(
        &mut self,
        handle: VisualHandle,
        position: Vec3,
        orientation: Quat,
    ) -> Result<(), TowerError> {
        let b = self
            .boxes
            .get_mut(&handle)
            .ok_or(TowerError::MissingVisual(handle))?;
        b.position = position;
        b.orientation = orientation;
        Ok(())
    }

    fn render_frame(&mut self, focus: Vec3) {
        self.camera_y += (focus.y - self.camera_y) * CAMERA_EASE;

        let width = self.canvas.width() as f64;
        let height = self.canvas.height() as f64;
        let scale = height / VIEW_HEIGHT_UNITS;
        let origin = (
            width / 2.0,
            height * FOCUS_SCREEN_FRACTION + self.camera_y as f64 * scale,
        );

        self.ctx.set_fill_style_str("#101018");
        self.ctx.fill_rect(0.0, 0.0, width, height);

        for b in self.boxes.values() {
            self.draw_box(b, scale, origin);
        }
    }

    fn set_debug_visuals(&mut self, enabled: bool) {
        self.debug_visuals = enabled;
    }
}
