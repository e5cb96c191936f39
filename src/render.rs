use crate::model::{NeedKind, Pet, MAX_STAT};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub struct CellBuffer {
    pub w: u16,
    pub h: u16,
    pub cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    pub fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }

    pub fn clear(&mut self, bg: Color) {
        self.cells.fill(Cell {
            bg,
            ..Cell::default()
        });
    }

    /// Text of row `y`, trailing spaces trimmed.
    pub fn row_text(&self, y: u16) -> String {
        let s: String = (0..self.w)
            .filter_map(|x| self.get(x, y))
            .map(|c| c.ch)
            .collect();
        s.trim_end().to_string()
    }
}

pub struct Terminal {
    out: io::Stdout,
    pub cols: u16,
    pub rows: u16,
    prev: CellBuffer,
    pub cur: CellBuffer,
}

impl Terminal {
    pub fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    /// Writes cells that changed since the last call.
    pub fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }
                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Primitives
------------------------------ */

pub fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

pub fn hline(buf: &mut CellBuffer, y: u16, fg: Color, bg: Color) {
    for x in 0..buf.w {
        buf.set(x, y, Cell { ch: '─', fg, bg });
    }
}

fn bar(value01: f32, width: usize) -> String {
    let v = value01.clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::new();
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}

/// Green above half, yellow above a quarter, red below.
pub fn need_color(value: u8, max: u8) -> Color {
    let pct = value.min(max) as u32 * 100 / max.max(1) as u32;
    if pct <= 25 {
        Color::Rgb {
            r: 0xbf,
            g: 0x61,
            b: 0x6a,
        }
    } else if pct <= 50 {
        Color::Rgb {
            r: 0xeb,
            g: 0xcb,
            b: 0x8b,
        }
    } else {
        Color::Rgb {
            r: 0xa3,
            g: 0xbe,
            b: 0x8c,
        }
    }
}

/// Splits `text` into lines no wider than `width`, breaking on spaces where
/// possible.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for raw in text.lines() {
        let mut line = String::new();
        for word in raw.split(' ') {
            let mut word = word.to_string();
            loop {
                let used = line.chars().count();
                let need = word.chars().count() + usize::from(used > 0);
                if used + need <= width {
                    if used > 0 {
                        line.push(' ');
                    }
                    line.push_str(&word);
                    break;
                }
                if used > 0 {
                    out.push(std::mem::take(&mut line));
                    continue;
                }
                // a single word longer than the line
                let head: String = word.chars().take(width).collect();
                word = word.chars().skip(width).collect();
                out.push(head);
                if word.is_empty() {
                    break;
                }
            }
        }
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

/* -----------------------------
   Panels
------------------------------ */

pub struct Palette {
    pub color: bool,
    pub fg: Color,
    pub bg: Color,
}

impl Palette {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            fg: Color::White,
            bg: Color::Black,
        }
    }

    fn tint(&self, c: Color) -> Color {
        if self.color {
            c
        } else {
            self.fg
        }
    }
}

pub fn draw_title(buf: &mut CellBuffer, pet: &Pet, pal: &Palette) {
    let state = if pet.alive { "alive" } else { "deceased" };
    let title = format!(
        "PetConsole  |  {} the {}  |  {}  |  every {}s",
        pet.name, pet.species, state, pet.decay_interval_secs
    );
    draw_text(buf, 1, 0, &title, pal.fg, pal.bg);
}

pub fn draw_stats(buf: &mut CellBuffer, needs: &[(NeedKind, u8)], x: u16, y: u16, pal: &Palette) {
    for (i, (kind, value)) in needs.iter().enumerate() {
        let row = y + i as u16;
        let label = format!("{:<8}", kind.name());
        draw_text(buf, x, row, &label, pal.fg, pal.bg);
        let b = bar(*value as f32 / MAX_STAT as f32, 14);
        draw_text(
            buf,
            x + 9,
            row,
            &b,
            pal.tint(need_color(*value, MAX_STAT)),
            pal.bg,
        );
        let num = format!("{:>3}/{}", value, MAX_STAT);
        draw_text(buf, x + 26, row, &num, pal.fg, pal.bg);
    }
}

pub fn draw_vocab(buf: &mut CellBuffer, pet: &Pet, x: u16, y: u16, width: u16, pal: &Palette) {
    draw_text(buf, x, y, "Knows:", pal.fg, pal.bg);
    let words = if pet.vocab.is_empty() {
        "(nothing yet)".to_string()
    } else {
        pet.vocab.join(", ")
    };
    for (i, line) in wrap(&words, width as usize).iter().take(3).enumerate() {
        draw_text(buf, x, y + 1 + i as u16, line, pal.fg, pal.bg);
    }
}

const PET_ALIVE: [&str; 7] = [
    "   /\\   /\\      ",
    "  /  \\_/  \\     ",
    " |  o   o  |~~  ",
    " |    ^    |  \\ ",
    "  \\  \\_/  /   / ",
    "   \\_____/___/  ",
    "    |_| |_|     ",
];

const PET_DEAD: [&str; 7] = [
    "   /\\   /\\      ",
    "  /  \\_/  \\     ",
    " |  x   x  |    ",
    " |    ^    |    ",
    "  \\  ___  /     ",
    "   \\_____/___   ",
    "    |_| |_|     ",
];

/// Small vertical hop for the idle animation.
pub fn bounce_offset(frame: u64) -> i32 {
    match (frame / 8) % 4 {
        1 => -1,
        _ => 0,
    }
}

pub fn draw_pet_ascii(buf: &mut CellBuffer, pet: &Pet, cx: i32, cy: i32, frame: u64, pal: &Palette) {
    let (sprite, hop) = if pet.alive {
        (PET_ALIVE, bounce_offset(frame))
    } else {
        (PET_DEAD, 0)
    };

    let mut grid = sprite.map(str::to_string);
    let low = NeedKind::ALL
        .into_iter()
        .any(|k| pet.needs.get(k) <= 25);
    if pet.alive && low {
        grid[4] = "  \\  /-\\  /   / ".to_string();
    }

    let w = grid[0].chars().count() as i32;
    let h = grid.len() as i32;
    let x0 = cx - w / 2;
    let y0 = cy - h / 2 + hop;
    let fg = if pet.alive {
        pal.tint(Color::Rgb {
            r: 0xd0,
            g: 0x87,
            b: 0x70,
        })
    } else {
        pal.tint(Color::DarkGrey)
    };

    for (yy, line) in grid.iter().enumerate() {
        let y = y0 + yy as i32;
        if y < 0 || y >= buf.h as i32 {
            continue;
        }
        for (xx, ch) in line.chars().enumerate() {
            let x = x0 + xx as i32;
            if x >= 0 && x < buf.w as i32 && ch != ' ' {
                buf.set(x as u16, y as u16, Cell { ch, fg, bg: pal.bg });
            }
        }
    }

    if let (true, Some(word)) = (pet.alive, pet.latest_word()) {
        let bubble = format!("( {word}! )");
        let bx = (x0 + w - 2).max(0) as u16;
        let by = y0 - 1;
        if by >= 0 {
            draw_text(buf, bx, by as u16, &bubble, pal.fg, pal.bg);
        }
    }
}

/// Draws the newest lines of `log` into rows `top..top+height`, skipping
/// `scroll` wrapped lines from the bottom. Returns the scroll actually used,
/// which never goes past the oldest screenful.
pub fn draw_log(
    buf: &mut CellBuffer,
    log: &[String],
    top: u16,
    height: u16,
    scroll: usize,
    pal: &Palette,
) -> usize {
    if height == 0 {
        return 0;
    }
    let width = buf.w.saturating_sub(2).max(1) as usize;
    let lines: Vec<String> = log.iter().flat_map(|m| wrap(m, width)).collect();
    let scroll = scroll.min(lines.len().saturating_sub(height as usize));
    let end = lines.len() - scroll;
    let start = end.saturating_sub(height as usize);
    for (i, line) in lines[start..end].iter().enumerate() {
        draw_text(buf, 1, top + i as u16, line, pal.fg, pal.bg);
    }
    scroll
}

pub fn draw_prompt(buf: &mut CellBuffer, input: &str, pal: &Palette) {
    let y = buf.h.saturating_sub(1);
    let visible = buf.w.saturating_sub(4) as usize;
    let count = input.chars().count();
    let shown: String = input.chars().skip(count.saturating_sub(visible)).collect();
    draw_text(buf, 0, y, &format!("> {shown}_"), pal.fg, pal.bg);
}
