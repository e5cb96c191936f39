use crate::command;
use crate::config::{load_settings, Cli, Paths, Settings};
use crate::input::{collect_input_nonblocking, InputAction, LineEditor};
use crate::model::{NeedKind, Pet, MAX_STAT};
use crate::render::{
    draw_log, draw_pet_ascii, draw_prompt, draw_stats, draw_title, draw_vocab, hline, CellBuffer,
    Palette, Terminal,
};
use crate::sim::Session;
use crate::view::PetView;
use chrono::Utc;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::info;

const PANEL_W: u16 = 34;

/// Terminal front end. Keeps the scrolling log and the last reported value
/// of each need, and composes a frame on every `render`.
pub struct Console {
    term: Terminal,
    palette: Palette,
    log: VecDeque<String>,
    max_log_lines: usize,
    scroll: usize,
    bars: [u8; 5],
    input: LineEditor,
    frame: u64,
}

impl Console {
    fn new(term: Terminal, settings: &Settings) -> Self {
        Self {
            term,
            palette: Palette::new(settings.enable_color),
            log: VecDeque::new(),
            max_log_lines: settings.max_log_lines.max(1),
            scroll: 0,
            bars: [0; 5],
            input: LineEditor::default(),
            frame: 0,
        }
    }

    fn push_line(&mut self, line: String) {
        self.log.push_back(line);
        while self.log.len() > self.max_log_lines {
            self.log.pop_front();
        }
    }

    fn echo(&mut self, line: &str) {
        self.push_line(format!("> {line}"));
        self.scroll = 0;
    }

    /// The upper bound depends on wrapping, so `compose` clamps it.
    fn scroll_by(&mut self, delta: i64) {
        self.scroll = (self.scroll as i64 + delta).max(0) as usize;
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.term.present()
    }

    fn compose(&mut self, pet: &Pet) {
        let pal = &self.palette;
        let buf: &mut CellBuffer = &mut self.term.cur;
        buf.clear(pal.bg);

        let rows = buf.h;
        let cols = buf.w;
        let split = (rows / 2).max(10).min(rows.saturating_sub(3));

        draw_title(buf, pet, pal);
        let needs: Vec<(NeedKind, u8)> = NeedKind::ALL
            .into_iter()
            .zip(self.bars)
            .collect();
        draw_stats(buf, &needs, 1, 2, pal);
        draw_vocab(buf, pet, 1, 8, PANEL_W.saturating_sub(2), pal);

        let pet_x = PANEL_W + cols.saturating_sub(PANEL_W) / 2;
        draw_pet_ascii(
            buf,
            pet,
            pet_x as i32,
            (split / 2 + 1) as i32,
            self.frame,
            pal,
        );

        hline(buf, split, pal.fg, pal.bg);
        let log: Vec<String> = self.log.iter().cloned().collect();
        let log_h = rows.saturating_sub(split + 2);
        self.scroll = draw_log(buf, &log, split + 1, log_h, self.scroll, pal);
        draw_prompt(buf, self.input.text(), pal);
    }
}

impl PetView for Console {
    fn render(&mut self, pet: &Pet) {
        self.frame = self.frame.wrapping_add(1);
        self.compose(pet);
    }

    fn display_need(&mut self, kind: NeedKind, value: u8, max: u8) {
        let i = NeedKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
        self.bars[i] = (value as u32 * MAX_STAT as u32 / max.max(1) as u32) as u8;
    }

    fn display_message(&mut self, text: &str) {
        for line in text.lines() {
            self.push_line(line.to_string());
        }
        self.scroll = 0;
    }
}

pub struct App {
    settings: Settings,
    session: Session,
    console: Console,
    should_quit: bool,
}

impl App {
    fn init(cli: &Cli, paths: &Paths) -> anyhow::Result<Self> {
        let settings_path = cli.settings.clone().unwrap_or_else(|| paths.settings_path.clone());
        let mut settings = load_settings(&settings_path)?;
        settings.apply_cli(cli);
        let config = settings.session_config()?;

        let now = Utc::now();
        let seed = settings.resolve_seed(now);
        info!(settings = %settings_path.display(), seed, "starting");

        let term = Terminal::begin()?;
        let mut console = Console::new(term, &settings);
        let session = Session::new(config, seed, now, &mut console);
        console.display_message("Type help for a list of commands.");

        Ok(Self {
            settings,
            session,
            console,
            should_quit: false,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        while !self.should_quit {
            self.console.term.resize_if_needed()?;

            for ev in collect_input_nonblocking(frame_dt)? {
                match self.console.input.handle(ev) {
                    Some(InputAction::Submit(line)) => {
                        self.console.echo(&line);
                        // rejections are already written to the log
                        let _ = command::submit(&mut self.session, &line, Utc::now(), &mut self.console);
                    }
                    Some(InputAction::ScrollUp) => self.console.scroll_by(5),
                    Some(InputAction::ScrollDown) => self.console.scroll_by(-5),
                    Some(InputAction::Quit) => {
                        self.should_quit = true;
                        break;
                    }
                    None => {}
                }
            }

            self.session.advance(Utc::now(), &mut self.console);
            self.session.render(&mut self.console);
            self.console.present()?;

            spin_sleep(frame_dt, Instant::now());
        }

        info!(
            alive = self.session.is_alive(),
            words = self.session.pet().vocab.len(),
            "quitting"
        );
        Ok(())
    }
}

pub fn run(cli: Cli, paths: Paths) -> anyhow::Result<()> {
    let mut app = App::init(&cli, &paths)?;
    let result = app.run();
    app.console.term.end()?;
    result
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
