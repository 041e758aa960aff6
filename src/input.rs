//! Input collection.
//!
//! winit events are translated into abstract [`InputEvent`]s and queued; the
//! frame loop drains the queue once at the top of every frame. Key repeats
//! are dropped so every toggle fires once per physical press.

use std::collections::VecDeque;

use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    CameraMove { direction: MoveDirection, pressed: bool },
    /// Mouse motion in pixels while looking is active.
    CameraLook { dx: f64, dy: f64 },
    ToggleFlashlight,
    ToggleUi,
    ToggleOverlay,
    ClearAccumulation,
    CyclePreset,
    ToggleLod,
    ToggleCulling,
    SaveConfig,
    LoadConfig,
    Quit,
}

/// Map a key transition to an event. Repeats never produce one, and toggles
/// only fire on press.
pub fn translate_key(code: KeyCode, pressed: bool, repeat: bool) -> Option<InputEvent> {
    if repeat {
        return None;
    }
    let direction = match code {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(MoveDirection::Forward),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(MoveDirection::Backward),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(MoveDirection::Left),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(MoveDirection::Right),
        KeyCode::Space => Some(MoveDirection::Up),
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(MoveDirection::Down),
        _ => None,
    };
    if let Some(direction) = direction {
        return Some(InputEvent::CameraMove { direction, pressed });
    }
    if !pressed {
        return None;
    }
    Some(match code {
        KeyCode::KeyF => InputEvent::ToggleFlashlight,
        KeyCode::Tab => InputEvent::ToggleUi,
        KeyCode::KeyO => InputEvent::ToggleOverlay,
        KeyCode::KeyC => InputEvent::ClearAccumulation,
        KeyCode::KeyP => InputEvent::CyclePreset,
        KeyCode::KeyL => InputEvent::ToggleLod,
        KeyCode::KeyK => InputEvent::ToggleCulling,
        KeyCode::F5 => InputEvent::SaveConfig,
        KeyCode::F9 => InputEvent::LoadConfig,
        KeyCode::Escape => InputEvent::Quit,
        _ => return None,
    })
}

#[derive(Debug, Default)]
pub struct InputCollector {
    queue: VecDeque<InputEvent>,
    looking: bool,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the event was consumed.
    pub fn window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return false;
                };
                let pressed = event.state == ElementState::Pressed;
                match translate_key(code, pressed, event.repeat) {
                    Some(input) => {
                        self.push(input);
                        true
                    }
                    None => false,
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state,
                ..
            } => {
                self.looking = *state == ElementState::Pressed;
                true
            }
            WindowEvent::Focused(false) => {
                // Keys released while unfocused never arrive.
                self.looking = false;
                for direction in [
                    MoveDirection::Forward,
                    MoveDirection::Backward,
                    MoveDirection::Left,
                    MoveDirection::Right,
                    MoveDirection::Up,
                    MoveDirection::Down,
                ] {
                    self.push(InputEvent::CameraMove {
                        direction,
                        pressed: false,
                    });
                }
                false
            }
            _ => false,
        }
    }

    pub fn device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.looking {
                self.push(InputEvent::CameraLook {
                    dx: delta.0,
                    dy: delta.1,
                });
            }
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }

    /// Take every queued event in arrival order.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_are_ignored() {
        assert_eq!(translate_key(KeyCode::KeyF, true, true), None);
        assert_eq!(translate_key(KeyCode::KeyW, true, true), None);
    }

    #[test]
    fn toggles_fire_on_press_only() {
        assert_eq!(translate_key(KeyCode::KeyF, true, false), Some(InputEvent::ToggleFlashlight));
        assert_eq!(translate_key(KeyCode::KeyF, false, false), None);
    }

    #[test]
    fn movement_reports_press_and_release() {
        assert_eq!(
            translate_key(KeyCode::KeyW, false, false),
            Some(InputEvent::CameraMove {
                direction: MoveDirection::Forward,
                pressed: false
            })
        );
    }

    #[test]
    fn mouse_motion_only_counts_while_looking() {
        let mut input = InputCollector::new();
        input.device_event(&DeviceEvent::MouseMotion { delta: (3.0, 1.0) });
        assert!(input.drain().is_empty());
        input.looking = true;
        input.device_event(&DeviceEvent::MouseMotion { delta: (3.0, 1.0) });
        assert_eq!(input.drain(), vec![InputEvent::CameraLook { dx: 3.0, dy: 1.0 }]);
    }
}
