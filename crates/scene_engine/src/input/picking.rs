//! Mouse state for picking operations
//!
//! Converts screen-space cursor coordinates (pixels from the top-left
//! corner) to Normalized Device Coordinates for
//! [`Scene::pick`](crate::scene::Scene::pick).

/// Mouse state for picking operations
#[derive(Debug, Clone)]
pub struct MouseState {
    /// Current screen-space X position (pixels)
    pub screen_x: f64,
    /// Current screen-space Y position (pixels)
    pub screen_y: f64,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
}

impl MouseState {
    /// Create a new mouse state with the cursor at the top-left corner
    pub fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            screen_x: 0.0,
            screen_y: 0.0,
            window_width,
            window_height,
        }
    }

    /// Convert screen coordinates to Normalized Device Coordinates (NDC)
    ///
    /// X runs from -1 (left) to 1 (right), Y from -1 (bottom) to 1 (top).
    pub fn screen_to_ndc(&self) -> (f32, f32) {
        let width = f64::from(self.window_width.max(1));
        let height = f64::from(self.window_height.max(1));
        let ndc_x = (self.screen_x / width) as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - (self.screen_y / height) as f32 * 2.0;
        (ndc_x, ndc_y)
    }

    /// Update mouse position from window events
    pub fn update_position(&mut self, x: f64, y: f64) {
        self.screen_x = x;
        self.screen_y = y;
    }

    /// Update window size (for NDC conversion)
    pub fn update_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }
}

impl Default for MouseState {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_to_ndc_center() {
        let mut mouse = MouseState::new(1920, 1080);
        mouse.update_position(960.0, 540.0);

        let (ndc_x, ndc_y) = mouse.screen_to_ndc();
        assert!(ndc_x.abs() < 0.001);
        assert!(ndc_y.abs() < 0.001);
    }

    #[test]
    fn test_screen_to_ndc_corners() {
        let mut mouse = MouseState::new(1920, 1080);

        let (ndc_x, ndc_y) = mouse.screen_to_ndc();
        assert!((ndc_x - (-1.0)).abs() < 0.001); // Left edge
        assert!((ndc_y - 1.0).abs() < 0.001); // Top edge

        mouse.update_position(1920.0, 1080.0);
        let (ndc_x, ndc_y) = mouse.screen_to_ndc();
        assert!((ndc_x - 1.0).abs() < 0.001);
        assert!((ndc_y - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_zero_sized_window_stays_finite() {
        let mouse = MouseState::new(0, 0);
        let (ndc_x, ndc_y) = mouse.screen_to_ndc();
        assert!(ndc_x.is_finite() && ndc_y.is_finite());
    }
}
