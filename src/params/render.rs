//! Window configuration.

/// Narrowest the window may be resized to (logical pixels)
pub const MIN_WINDOW_WIDTH: u32 = 150;

/// Widest the window may be resized to (logical pixels)
pub const MAX_WINDOW_WIDTH: u32 = 900;

/// The scope has a fixed height (logical pixels)
pub const WINDOW_HEIGHT: u32 = 300;

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Initial window width (logical pixels)
    pub window_width: u32,

    /// Window height (logical pixels)
    pub window_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 600,
            window_height: WINDOW_HEIGHT,
        }
    }
}

impl RenderConfig {
    /// Smallest resizable size (width, height)
    pub fn min_size(&self) -> (u32, u32) {
        (MIN_WINDOW_WIDTH, WINDOW_HEIGHT)
    }

    /// Largest resizable size (width, height)
    pub fn max_size(&self) -> (u32, u32) {
        (MAX_WINDOW_WIDTH, WINDOW_HEIGHT)
    }

    /// Requested size pulled into the resize limits
    pub fn initial_size(&self) -> (u32, u32) {
        let (min_w, min_h) = self.min_size();
        let (max_w, max_h) = self.max_size();
        (
            self.window_width.clamp(min_w, max_w),
            self.window_height.clamp(min_h, max_h),
        )
    }
}
