//! Scene collaborator
//!
//! The tower core never draws. It creates, moves and removes boxes through
//! [`RenderScene`]; how they reach the screen is up to the implementation.

#[cfg(target_arch = "wasm32")]
pub mod canvas;
pub mod recorder;
pub mod style;

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasScene;
pub use recorder::SceneRecorder;
pub use style::{BoxStyle, StylePicker};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::TowerError;
use crate::sim::BlockId;

/// Opaque handle to a visual object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisualHandle(pub u32);

/// Narrow interface the tower core consumes from a renderer
pub trait RenderScene {
    /// Add a box of full `size`; `tag` is the owning block
    fn create_box(&mut self, size: Vec3, style: BoxStyle, tag: BlockId) -> VisualHandle;

    /// Drop a visual. Returns false if it was unknown.
    fn remove(&mut self, handle: VisualHandle) -> bool;

    fn set_transform(
        &mut self,
        handle: VisualHandle,
        position: Vec3,
        orientation: Quat,
    ) -> Result<(), TowerError>;

    /// Draw one frame; `focus` is the point the camera should keep in view
    fn render_frame(&mut self, focus: Vec3);

    /// Physics debug overlay on/off
    fn set_debug_visuals(&mut self, _enabled: bool) {}
}
