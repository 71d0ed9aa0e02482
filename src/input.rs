//! Pointer input as a detector source.
//!
//! [`PointerInput`] turns winit window events into [`DetectorFrame::Pointer`]
//! snapshots, so a mouse or touchscreen can drive the simulation exactly like
//! a hand detector would. Positions are normalized to `[0, 1]` with y down,
//! the same space hand landmarks use.
//!
//! ```ignore
//! // In the winit event handler:
//! pointer.handle_event(&event);
//!
//! // Once per frame:
//! sim.ingest(pointer.frame());
//! pointer.begin_frame();
//! ```

use crate::influence::DetectorFrame;
use glam::Vec2;
use winit::event::{ElementState, MouseButton, TouchPhase, WindowEvent};

/// Mouse and touch tracker.
#[derive(Debug)]
pub struct PointerInput {
    /// Last position in physical pixels.
    position: Vec2,
    window_size: (u32, u32),
    /// Cursor is over the window or a finger is down.
    inside: bool,
    held: bool,
    /// A press happened since the last [`begin_frame`](Self::begin_frame).
    pressed: bool,
    /// Touches leave the pointer absent once lifted.
    touch_only: bool,
}

impl PointerInput {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Vec2::ZERO,
            window_size: (width, height),
            inside: false,
            held: false,
            pressed: false,
            touch_only: false,
        }
    }

    // ========== Queries ==========

    /// Current snapshot, or absent when nothing points at the window.
    pub fn frame(&self) -> DetectorFrame {
        if !self.inside {
            return DetectorFrame::Absent;
        }
        DetectorFrame::Pointer {
            position: self.normalized(),
            pressed: self.pressed,
        }
    }

    /// Position in `[0, 1]` image space.
    pub fn normalized(&self) -> Vec2 {
        let (w, h) = self.window_size;
        if w == 0 || h == 0 {
            return Vec2::splat(0.5);
        }
        let uv = self.position / Vec2::new(w as f32, h as f32);
        uv.clamp(Vec2::ZERO, Vec2::ONE)
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn was_pressed(&self) -> bool {
        self.pressed
    }

    // ========== Updates ==========

    /// Clear per-frame one-shots. Call after the frame has been read.
    pub fn begin_frame(&mut self) {
        self.pressed = false;
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    /// Process a winit window event. Unrelated events are ignored.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => self.set_window_size(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => {
                self.touch_only = false;
                self.moved(position.x as f32, position.y as f32);
            }
            WindowEvent::CursorLeft { .. } => self.left(),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.button(*state == ElementState::Pressed),
            WindowEvent::Touch(touch) => {
                self.touch_only = true;
                let (x, y) = (touch.location.x as f32, touch.location.y as f32);
                match touch.phase {
                    TouchPhase::Started => {
                        self.moved(x, y);
                        self.button(true);
                    }
                    TouchPhase::Moved => self.moved(x, y),
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        self.button(false);
                        self.left();
                    }
                }
            }
            _ => {}
        }
    }

    fn moved(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
        self.inside = true;
    }

    fn left(&mut self) {
        self.inside = false;
        self.held = false;
    }

    fn button(&mut self, down: bool) {
        if down && !self.held {
            self.pressed = true;
        }
        self.held = down;
        if self.touch_only && !down {
            self.inside = false;
        }
    }
}

impl Default for PointerInput {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_until_moved() {
        let mut input = PointerInput::new(800, 600);
        assert_eq!(input.frame(), DetectorFrame::Absent);

        input.moved(400.0, 150.0);
        assert_eq!(
            input.frame(),
            DetectorFrame::Pointer {
                position: Vec2::new(0.5, 0.25),
                pressed: false
            }
        );
    }

    #[test]
    fn test_press_is_one_shot() {
        let mut input = PointerInput::default();
        input.moved(10.0, 10.0);
        input.button(true);
        assert!(matches!(input.frame(), DetectorFrame::Pointer { pressed: true, .. }));

        input.begin_frame();
        assert!(input.is_held());
        assert!(matches!(input.frame(), DetectorFrame::Pointer { pressed: false, .. }));
    }

    #[test]
    fn test_cursor_left_is_absent() {
        let mut input = PointerInput::default();
        input.moved(10.0, 10.0);
        input.left();
        assert_eq!(input.frame(), DetectorFrame::Absent);
    }

    #[test]
    fn test_position_clamped() {
        let mut input = PointerInput::new(100, 100);
        input.moved(-20.0, 250.0);
        assert_eq!(input.normalized(), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_zero_window_is_centered() {
        let mut input = PointerInput::new(0, 0);
        input.moved(10.0, 10.0);
        assert_eq!(input.normalized(), Vec2::splat(0.5));
    }
}
