// Input state. The window is polled at every peek; transitions are queued as
// events and the current held set is kept for level-triggered checks. The
// scripted source replaces the window under tests.

use bitflags::bitflags;
use minifb::{Key, MouseButton, MouseMode, Window};
use std::collections::VecDeque;

bitflags! {
    pub struct Buttons: u8 {
        const ACTIVATE = 1 << 0;
        const CANCEL   = 1 << 1;
        const SHIFT    = 1 << 2;
        const UP       = 1 << 3;
        const DOWN     = 1 << 4;
        const LEFT     = 1 << 5;
        const RIGHT    = 1 << 6;
    }
}

pub const INPUT_NR_INPUTS: u32 = 7;

pub fn input_from_no(no: u32) -> Option<Buttons> {
    match no {
        0 => Some(Buttons::ACTIVATE),
        1 => Some(Buttons::CANCEL),
        2 => Some(Buttons::SHIFT),
        3 => Some(Buttons::UP),
        4 => Some(Buttons::DOWN),
        5 => Some(Buttons::LEFT),
        6 => Some(Buttons::RIGHT),
        _ => None,
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Down(Buttons),
    Up(Buttons),
}

pub struct Input {
    held: Buttons,
    events: VecDeque<InputEvent>,
    cursor_x: i32,
    cursor_y: i32,
    scripted: bool,
    scripted_held: Buttons,
}

impl Input {
    pub fn new(scripted: bool) -> Self {
        Input {
            held: Buttons::empty(),
            events: VecDeque::new(),
            cursor_x: 0,
            cursor_y: 0,
            scripted,
            scripted_held: Buttons::empty(),
        }
    }

    // Test hook: the given set reads as held from the next poll on.
    pub fn script_held(&mut self, held: Buttons) {
        self.scripted_held = held;
    }

    // Test hook: queue a press/release pair.
    pub fn script_press(&mut self, button: Buttons) {
        self.events.push_back(InputEvent::Down(button));
        self.events.push_back(InputEvent::Up(button));
    }

    pub fn poll(&mut self, window: Option<&mut Window>) {
        let now = if self.scripted {
            self.scripted_held
        } else if let Some(window) = window {
            let mut now = Buttons::empty();
            if window.is_key_down(Key::Enter) || window.is_key_down(Key::Space) {
                now |= Buttons::ACTIVATE;
            }
            if window.get_mouse_down(MouseButton::Left) {
                now |= Buttons::ACTIVATE;
            }
            if window.is_key_down(Key::Escape) || window.get_mouse_down(MouseButton::Right) {
                now |= Buttons::CANCEL;
            }
            if window.is_key_down(Key::LeftShift) || window.is_key_down(Key::RightShift) {
                now |= Buttons::SHIFT;
            }
            if window.is_key_down(Key::Up) {
                now |= Buttons::UP;
            }
            if window.is_key_down(Key::Down) {
                now |= Buttons::DOWN;
            }
            if window.is_key_down(Key::Left) {
                now |= Buttons::LEFT;
            }
            if window.is_key_down(Key::Right) {
                now |= Buttons::RIGHT;
            }
            if let Some((x, y)) = window.get_mouse_pos(MouseMode::Clamp) {
                self.cursor_x = x as i32;
                self.cursor_y = y as i32;
            }
            now
        } else {
            self.held
        };

        let pressed = now - self.held;
        let released = self.held - now;
        for b in [
            Buttons::ACTIVATE,
            Buttons::CANCEL,
            Buttons::SHIFT,
            Buttons::UP,
            Buttons::DOWN,
            Buttons::LEFT,
            Buttons::RIGHT,
        ]
        .iter()
        {
            if pressed.contains(*b) {
                self.events.push_back(InputEvent::Down(*b));
            }
            if released.contains(*b) {
                self.events.push_back(InputEvent::Up(*b));
            }
        }
        self.held = now;
    }

    pub fn down(&self, button: Buttons) -> bool {
        self.held.contains(button) || self.scripted_held.contains(button)
    }

    pub fn pop_event(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    pub fn requeue(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn cursor_pos(&self) -> (i32, i32) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn set_cursor_pos(&mut self, x: i32, y: i32) {
        self.cursor_x = x;
        self.cursor_y = y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_become_events() {
        let mut input = Input::new(true);
        input.script_held(Buttons::ACTIVATE);
        input.poll(None);
        assert_eq!(input.pop_event(), Some(InputEvent::Down(Buttons::ACTIVATE)));
        assert!(input.down(Buttons::ACTIVATE));
        input.script_held(Buttons::empty());
        input.poll(None);
        assert_eq!(input.pop_event(), Some(InputEvent::Up(Buttons::ACTIVATE)));
        assert!(!input.down(Buttons::ACTIVATE));
    }

    #[test]
    fn input_numbers_map_to_buttons() {
        assert_eq!(input_from_no(0), Some(Buttons::ACTIVATE));
        assert_eq!(input_from_no(2), Some(Buttons::SHIFT));
        assert_eq!(input_from_no(INPUT_NR_INPUTS), None);
    }
}
