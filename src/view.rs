//! Presentation contract between the simulation and whatever draws it.

use crate::model::{NeedKind, Pet};

/// Everything the engine and interpreter need from a front end.
///
/// `display_need` is called once per need when a session starts and again
/// whenever that need changes. `display_message` receives one line per
/// notification (death, decay, feed, teach, give, help, diagnostics).
pub trait PetView {
    fn render(&mut self, pet: &Pet);
    fn display_need(&mut self, kind: NeedKind, value: u8, max: u8);
    fn display_message(&mut self, text: &str);
}

/// Records every call. Used for headless runs and tests.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    pub messages: Vec<String>,
    pub need_updates: Vec<(NeedKind, u8)>,
    pub frames: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.need_updates.clear();
        self.frames = 0;
    }
}

impl PetView for Transcript {
    fn render(&mut self, _pet: &Pet) {
        self.frames += 1;
    }

    fn display_need(&mut self, kind: NeedKind, value: u8, _max: u8) {
        self.need_updates.push((kind, value));
    }

    fn display_message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }
}
