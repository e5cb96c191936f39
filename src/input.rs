use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

const LINE_MAX: usize = 120;

#[derive(Clone, Debug)]
pub struct InputEvent {
    pub key: KeyCode,
    pub mods: KeyModifiers,
}

impl InputEvent {
    pub fn new(key: KeyCode) -> Self {
        Self {
            key,
            mods: KeyModifiers::NONE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputAction {
    Submit(String),
    ScrollUp,
    ScrollDown,
    Quit,
}

pub fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

/// The console input line.
#[derive(Clone, Debug, Default)]
pub struct LineEditor {
    buf: String,
}

impl LineEditor {
    pub fn text(&self) -> &str {
        &self.buf
    }

    pub fn handle(&mut self, ev: InputEvent) -> Option<InputAction> {
        if ev.mods.contains(KeyModifiers::CONTROL) {
            return match ev.key {
                KeyCode::Char('c') | KeyCode::Char('d') => Some(InputAction::Quit),
                KeyCode::Char('u') => {
                    self.buf.clear();
                    None
                }
                _ => None,
            };
        }

        match ev.key {
            KeyCode::Enter => Some(InputAction::Submit(std::mem::take(&mut self.buf))),
            KeyCode::Esc => Some(InputAction::Quit),
            KeyCode::PageUp => Some(InputAction::ScrollUp),
            KeyCode::PageDown => Some(InputAction::ScrollDown),
            KeyCode::Backspace => {
                self.buf.pop();
                None
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                if self.buf.chars().count() < LINE_MAX {
                    self.buf.push(ch);
                }
                None
            }
            _ => None,
        }
    }
}
