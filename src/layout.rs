//! Sidebar width and the drag-to-resize gesture.
//!
//! The window-scoped pointer listeners live exactly as long as the drag:
//! [`SidebarLayout::begin_drag`] acquires them and returns a session guard
//! whose `Drop` releases them, whether the drag ends normally or the view
//! is torn down mid-gesture.

pub const MIN_SIDEBAR_WIDTH: f64 = 200.0;
pub const MAX_SIDEBAR_WIDTH: f64 = 600.0;
pub const DEFAULT_SIDEBAR_WIDTH: f64 = 300.0;

/// Window-scoped pointer-move/pointer-up listeners, as a capability the
/// embedder provides. Acquired for the duration of a drag only.
pub trait PointerCapture {
    fn acquire(&self);
    fn release(&self);
}

#[derive(Debug, Clone, Copy)]
pub struct SidebarLayout {
    width: f64,
}

impl Default for SidebarLayout {
    fn default() -> Self {
        Self {
            width: DEFAULT_SIDEBAR_WIDTH,
        }
    }
}

impl SidebarLayout {
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Start a resize gesture. Listeners are acquired now and released
    /// when the returned session drops.
    pub fn begin_drag<'a>(
        &'a mut self,
        capture: &'a dyn PointerCapture,
    ) -> DragSession<'a> {
        capture.acquire();
        DragSession {
            layout: self,
            capture,
        }
    }
}

/// An in-progress resize drag. Pointer-x updates clamp the width to
/// `200..=600`.
pub struct DragSession<'a> {
    layout: &'a mut SidebarLayout,
    capture: &'a dyn PointerCapture,
}

impl DragSession<'_> {
    pub fn update(&mut self, pointer_x: f64) {
        self.layout.width = pointer_x.clamp(MIN_SIDEBAR_WIDTH, MAX_SIDEBAR_WIDTH);
    }

    pub fn width(&self) -> f64 {
        self.layout.width
    }
}

impl Drop for DragSession<'_> {
    fn drop(&mut self) {
        self.capture.release();
    }
}
