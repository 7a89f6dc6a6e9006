/// Terminal presentation: one character cell per 16 px tile.
///
/// Each frame is composed into plain rows of glyphs, then only the rows
/// that differ from the previous frame are reprinted. Commands are
/// batched with `queue!` and flushed once, which is enough to avoid
/// flicker at this scale.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::tile::{
    T_CRATE, T_DOOR, T_DOOR_TOP, T_LADDER_L, T_LADDER_R, T_POLE_TOP, T_ROPE_ITEM,
};
use crate::sim::world::{World, ROWS, TILE};

/// Width of the visible window, in tile columns.
const VIEW_COLS: usize = 40;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    /// Rows as printed last frame; a changed row forces a reprint.
    prev_rows: Vec<Vec<char>>,
    prev_status: String,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(8192, io::stdout()),
            prev_rows: Vec::new(),
            prev_status: String::new(),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            Clear(ClearType::All)
        )
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &World, status: &str) -> io::Result<()> {
        let rows = compose_frame(world);

        if self.prev_rows.len() != rows.len() {
            self.prev_rows = vec![Vec::new(); rows.len()];
        }
        for (y, row) in rows.iter().enumerate() {
            if *row == self.prev_rows[y] {
                continue;
            }
            queue!(self.writer, MoveTo(0, y as u16))?;
            for &ch in row {
                queue!(self.writer, SetForegroundColor(glyph_color(ch)), Print(ch))?;
            }
            self.prev_rows[y] = row.clone();
        }

        if status != self.prev_status {
            queue!(
                self.writer,
                MoveTo(0, ROWS as u16 + 1),
                SetForegroundColor(Color::Grey),
                Clear(ClearType::UntilNewLine),
                Print(status)
            )?;
            self.prev_status = status.to_string();
        }

        self.writer.flush()
    }
}

/// Build the visible window as rows of glyphs: tiles first, then the
/// cable, blocks, and the player on top.
fn compose_frame(world: &World) -> Vec<Vec<char>> {
    let player_col = (world.player.pos.x / TILE as f64).floor() as i32;
    let max_cam = (world.plane.width() as i32 - VIEW_COLS as i32).max(0);
    let cam = (player_col - VIEW_COLS as i32 / 2).clamp(0, max_cam);

    let mut rows = vec![vec![' '; VIEW_COLS]; ROWS];
    for y in 0..ROWS as i32 {
        for x in 0..VIEW_COLS as i32 {
            rows[y as usize][x as usize] = tile_glyph(world.plane.get(cam + x, y));
        }
    }

    let mut put = |px: f64, py: f64, ch: char| {
        let x = (px / TILE as f64).floor() as i32 - cam;
        let y = (py / TILE as f64).floor() as i32;
        if (0..VIEW_COLS as i32).contains(&x) && (0..ROWS as i32).contains(&y) {
            rows[y as usize][x as usize] = ch;
        }
    };

    if let Some(rope) = world.player.rope.as_ref() {
        // dotted cable from the player to the head
        let dx = rope.pos.x - world.player.pos.x;
        let dy = rope.pos.y - world.player.pos.y;
        let steps = ((dx.hypot(dy) / 8.0).ceil() as i32).max(1);
        for i in 1..steps {
            let t = i as f64 / steps as f64;
            put(world.player.pos.x + dx * t, world.player.pos.y + dy * t, '.');
        }
        put(rope.pos.x, rope.pos.y, '+');
    }

    for block in &world.blocks {
        if let Some((bx, by, _, _)) = block.hitbox() {
            put(bx + 8.0, by + 8.0, 'O');
        }
    }

    put(world.player.pos.x, world.player.pos.y, '@');

    rows
}

fn tile_glyph(t: u8) -> char {
    match t {
        0 => ' ',
        T_CRATE => 'B',
        T_POLE_TOP => 'T',
        T_LADDER_R => '>',
        T_LADDER_L => '<',
        T_ROPE_ITEM => '*',
        T_DOOR_TOP => 'd',
        T_DOOR => 'D',
        13 => '%',
        17 => '-',
        _ => '#',
    }
}

fn glyph_color(ch: char) -> Color {
    match ch {
        '@' => Color::Yellow,
        '+' | '.' => Color::Cyan,
        'O' | 'B' => Color::DarkYellow,
        '*' => Color::Magenta,
        'd' | 'D' => Color::Green,
        'T' | '>' | '<' => Color::DarkCyan,
        '%' => Color::Red,
        '-' => Color::DarkGrey,
        _ => Color::White,
    }
}
