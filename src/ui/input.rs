/// Input state tracker.
///
/// Tracks which keys are currently held down and folds them into the
/// NES-order bitmask the simulation consumes:
///   - `vkeys`: buttons held this frame
///   - `new_vkeys`: buttons that went from released to held this frame
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind};

use crate::domain::player::{VK_A, VK_DOWN, VK_LEFT, VK_RIGHT, VK_UP};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,

    /// Bitmask of the previous frame, for edge detection.
    last_vkeys: u8,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
            last_vkeys: 0,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation step.
    pub fn drain_events(&mut self) {
        self.raw_events.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => {
                    self.raw_events.push(key);
                    match key.kind {
                        KeyEventKind::Release if self.honor_release => {
                            self.last_active.remove(&key.code);
                        }
                        KeyEventKind::Release => {
                            // Ignore release when enhancement not confirmed;
                            // rely on timeout-based expiry instead
                        }
                        _ => {
                            self.last_active.insert(key.code, Instant::now());
                        }
                    }
                }
                _ => {}
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active
            .retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Current held set and its fresh edges, as simulation bitmasks.
    pub fn read_pads(&mut self) -> (u8, u8) {
        let mut vkeys = 0u8;
        for code in self.last_active.keys() {
            vkeys |= match code {
                KeyCode::Up => VK_UP,
                KeyCode::Down => VK_DOWN,
                KeyCode::Left => VK_LEFT,
                KeyCode::Right => VK_RIGHT,
                KeyCode::Char('z') | KeyCode::Char('x') | KeyCode::Char(' ') => VK_A,
                _ => 0,
            };
        }
        let new_vkeys = vkeys & !self.last_vkeys;
        self.last_vkeys = vkeys;
        (vkeys, new_vkeys)
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        use crossterm::event::KeyModifiers;
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Was this key seen at all this frame? (for one-shot meta keys)
    pub fn key_seen(&self, code: KeyCode) -> bool {
        self.raw_events
            .iter()
            .any(|k| k.code == code && k.kind != KeyEventKind::Release)
    }
}
