//! Headless scene
//!
//! Keeps the latest transform of every box and counts frames. Used by the
//! native demo and by tests that need to see what the core asked for.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use super::{BoxStyle, RenderScene, VisualHandle};
use crate::TowerError;
use crate::sim::BlockId;

/// A box as last reported to the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedBox {
    pub size: Vec3,
    pub style: BoxStyle,
    pub tag: BlockId,
    pub position: Vec3,
    pub orientation: Quat,
}

#[derive(Debug, Default)]
pub struct SceneRecorder {
    boxes: BTreeMap<VisualHandle, RecordedBox>,
    next_handle: u32,
    pub frames: u64,
    pub last_focus: Vec3,
    pub debug_visuals: bool,
}

impl SceneRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: VisualHandle) -> Option<&RecordedBox> {
        self.boxes.get(&handle)
    }

    /// Visual owned by a block, if any
    pub fn find_by_tag(&self, tag: BlockId) -> Option<(VisualHandle, &RecordedBox)> {
        self.boxes
            .iter()
            .find(|(_, b)| b.tag == tag)
            .map(|(h, b)| (*h, b))
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl RenderScene for SceneRecorder {
    fn create_box(&mut self, size: Vec3, style: BoxStyle, tag: BlockId) -> VisualHandle {
        self.next_handle += 1;
        let handle = VisualHandle(self.next_handle);
        self.boxes.insert(
            handle,
            RecordedBox {
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
        self.frames += 1;
        self.last_focus = focus;
    }

    fn set_debug_visuals(&mut self, enabled: bool) {
        self.debug_visuals = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_unknown_handle_errors() {
        let mut scene = SceneRecorder::new();
        let err = scene
            .set_transform(VisualHandle(99), Vec3::ZERO, Quat::IDENTITY)
            .unwrap_err();
        assert_eq!(err, TowerError::MissingVisual(VisualHandle(99)));
    }

    #[test]
    fn test_create_move_remove() {
        let mut scene = SceneRecorder::new();
        let h = scene.create_box(Vec3::new(5.0, 1.0, 5.0), BoxStyle::default(), BlockId(3));
        scene.set_transform(h, Vec3::Y, Quat::IDENTITY).unwrap();
        assert_eq!(scene.find_by_tag(BlockId(3)).unwrap().1.position, Vec3::Y);
        assert!(scene.remove(h));
        assert!(scene.is_empty());
    }
}
