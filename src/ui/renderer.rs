/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The game works in pixels. One 32x32 tile maps to two terminal columns
/// and one row, so a terminal cell covers 16x32 pixels.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Sprite, Surface};
use crate::domain::geometry::{Rect, Vector2};
use crate::domain::layer::Layer;
use crate::domain::tile::{LayerRole, TileGrid, TILE_SIZE};
use crate::sim::controller::LevelController;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// gaps between rows match the cells on VTE-based terminals.
    const BASE_BG: Color = Color::Rgb { r: 12, g: 12, b: 20 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let x = self.width.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Canvas: the map's drawing surface ──

/// Pixels per terminal column / row.
const CELL_PX_W: f64 = TILE_SIZE / 2.0;
const CELL_PX_H: f64 = TILE_SIZE;

/// Terminal cell holding the pixel `(x, y)`, if it is on the canvas.
fn px_to_cell(x: f64, y: f64, cols: usize, rows: usize) -> Option<(usize, usize)> {
    let cx = (x / CELL_PX_W).floor();
    let cy = (y / CELL_PX_H).floor();
    if cx < 0.0 || cy < 0.0 || cx >= cols as f64 || cy >= rows as f64 {
        return None;
    }
    Some((cx as usize, cy as usize))
}

fn layer_style(role: LayerRole) -> (char, Color, Color) {
    match role {
        LayerRole::Ground => ('·', Color::Rgb { r: 45, g: 45, b: 60 }, Color::Rgb { r: 24, g: 24, b: 34 }),
        LayerRole::Walls => ('█', Color::Rgb { r: 120, g: 120, b: 135 }, Color::Rgb { r: 70, g: 70, b: 85 }),
        LayerRole::Solid => ('▓', Color::Rgb { r: 90, g: 130, b: 220 }, Color::Rgb { r: 30, g: 50, b: 110 }),
        LayerRole::Blockers => ('≈', Color::Rgb { r: 255, g: 230, b: 90 }, Color::Rgb { r: 110, g: 80, b: 10 }),
    }
}

fn sprite_style(sprite: Sprite) -> (char, Color) {
    match sprite {
        Sprite::Player { killed: false } => ('@', Color::Rgb { r: 255, g: 255, b: 255 }),
        Sprite::Player { killed: true } => ('x', Color::Rgb { r: 255, g: 60, b: 60 }),
        Sprite::Pursuer { stuck: false } => ('G', Color::Rgb { r: 220, g: 90, b: 255 }),
        Sprite::Pursuer { stuck: true } => ('G', Color::Rgb { r: 255, g: 230, b: 60 }),
        Sprite::Artifact => ('◆', Color::Rgb { r: 80, g: 240, b: 220 }),
        Sprite::Switch { pressed: false } => ('○', Color::Rgb { r: 255, g: 140, b: 60 }),
        Sprite::Switch { pressed: true } => ('●', Color::Rgb { r: 255, g: 140, b: 60 }),
    }
}

/// Map area of the frame buffer: `rows` rows starting at `top`.
struct Canvas<'a> {
    buf: &'a mut FrameBuffer,
    top: usize,
    rows: usize,
}

impl Canvas<'_> {
    fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        px_to_cell(x, y, self.buf.width, self.rows).map(|(cx, cy)| (cx, cy + self.top))
    }
}

impl Surface for Canvas<'_> {
    fn draw_layer(&mut self, grid: &TileGrid, layer: &Layer, offset: Vector2) {
        let (ch, fg, bg) = layer_style(layer.role());
        for (col, row) in grid.filled(layer.role()) {
            let x = col as f64 * TILE_SIZE + offset.x;
            let y = row as f64 * TILE_SIZE + offset.y;
            for half in [0.0, CELL_PX_W] {
                if let Some((cx, cy)) = self.cell_at(x + half, y) {
                    self.buf.set(cx, cy, Cell::new(ch, fg, bg));
                }
            }
        }
    }

    fn draw_sprite(&mut self, sprite: Sprite, bounds: Rect) {
        let c = bounds.center();
        let Some((cx, cy)) = self.cell_at(c.x, c.y) else { return };
        let (ch, fg) = sprite_style(sprite);
        let bg = self.buf.get(cx, cy).bg;
        self.buf.set(cx, cy, Cell::new(ch, fg, bg));
    }
}

// ── Renderer ──

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 1;
/// HUD above the map, help bar below.
const RESERVED_ROWS: usize = MAP_ROW + 1;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const INFO_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const TITLE_FG: Color = Color::Rgb { r: 220, g: 90, b: 255 };

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Screen {
    Title,
    Game,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<Screen>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// Map viewport in pixels for the current terminal size.
    pub fn viewport_px(&self) -> (f64, f64) {
        let rows = self.term_h.saturating_sub(RESERVED_ROWS).max(1);
        (self.term_w as f64 * CELL_PX_W, rows as f64 * CELL_PX_H)
    }

    pub fn render_title(&mut self, level_count: usize) -> io::Result<()> {
        self.begin(Screen::Title)?;

        let title = [
            r" _____ _              ___     _ _              ",
            r"|_   _| |_  ___ _  _ | __|__ | | |_____ __ __ ",
            r"  | | | ' \/ -_) || || _/ _ \| | / _ \ V  V / ",
            r"  |_| |_||_\___|\_, ||_|\___/|_|_\___/\_/\_/  ",
            r"                |__/                          ",
        ];
        let top = self.front.height.saturating_sub(14) / 2;
        for (i, line) in title.iter().enumerate() {
            self.front.put_centered(top + i, line, TITLE_FG, Color::Reset);
        }

        let levels = format!("{level_count} levels");
        self.front.put_centered(top + 7, &levels, Color::DarkGrey, Color::Reset);
        self.front.put_centered(top + 9, "PRESS ENTER", Color::White, Color::Reset);
        self.front.put_centered(
            top + 12,
            "←→↑↓ / WASD  move     ENTER  confirm     ESC  quit",
            Color::DarkGrey,
            Color::Reset,
        );

        self.finish()
    }

    pub fn render_game(&mut self, game: &mut LevelController, now: f64) -> io::Result<()> {
        self.begin(Screen::Game)?;
        let (vw, vh) = self.viewport_px();
        game.set_viewport(vw, vh);

        // ── HUD row ──
        let map = game.map();
        let mut hud = format!(" {}/{}  {} ", game.level_index() + 1, game.level_count(), map.name());
        if let Some(status) = game.status_text() {
            hud.push_str(&format!("  {status}"));
        }
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map ──
        let rows = self.term_h.saturating_sub(RESERVED_ROWS);
        game.render(&mut Canvas { buf: &mut self.front, top: MAP_ROW, rows });

        // ── Info text, centered over the map ──
        if let Some(text) = game.info_text(now) {
            let msg = format!(" {text} ");
            self.front.put_centered(MAP_ROW + rows / 2, &msg, Color::Black, INFO_BG);
        }

        // ── Help bar ──
        let help_row = self.front.height.saturating_sub(1);
        let help = if game.is_complete() {
            " ESC Quit"
        } else {
            " ←→↑↓/WASD Move  ENTER Try again  ESC Quit"
        };
        self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);

        self.finish()
    }

    // ── Frame lifecycle ──

    fn begin(&mut self, screen: Screen) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let resized = tw as usize != self.term_w || th as usize != self.term_h;
        if resized {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
        }
        if resized || self.last_screen != Some(screen) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(screen);
        }
        self.front.clear();
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::test_support::Fixture;

    #[test]
    fn pixels_map_to_half_tile_columns() {
        assert_eq!(px_to_cell(0.0, 0.0, 10, 5), Some((0, 0)));
        assert_eq!(px_to_cell(17.0, 31.9, 10, 5), Some((1, 0)));
        assert_eq!(px_to_cell(64.0, 32.0, 10, 5), Some((4, 1)));
        assert_eq!(px_to_cell(-0.5, 0.0, 10, 5), None);
        assert_eq!(px_to_cell(160.0, 0.0, 10, 5), None);
    }

    #[test]
    fn layer_fills_two_columns_per_tile() {
        let f = Fixture::new(&[" =", "  "]);
        let mut buf = FrameBuffer::new(6, 4);
        let mut canvas = Canvas { buf: &mut buf, top: 1, rows: 3 };
        canvas.draw_layer(&f.grid, &f.layers[LayerRole::Walls.index()], Vector2::ZERO);
        assert_eq!(buf.get(2, 1).ch, '█');
        assert_eq!(buf.get(3, 1).ch, '█');
        assert_eq!(buf.get(1, 1), Cell::BLANK);
        assert_eq!(buf.get(2, 0), Cell::BLANK);
    }

    #[test]
    fn camera_offset_shifts_layers() {
        let f = Fixture::new(&["= "]);
        let mut buf = FrameBuffer::new(6, 2);
        let mut canvas = Canvas { buf: &mut buf, top: 0, rows: 2 };
        canvas.draw_layer(&f.grid, &f.layers[LayerRole::Walls.index()], Vector2::new(32.0, 0.0));
        assert_eq!(buf.get(0, 0), Cell::BLANK);
        assert_eq!(buf.get(2, 0).ch, '█');
    }

    #[test]
    fn sprite_keeps_the_floor_background() {
        let mut buf = FrameBuffer::new(4, 2);
        buf.set(1, 0, Cell::new('·', Color::Grey, Color::Blue));
        let mut canvas = Canvas { buf: &mut buf, top: 0, rows: 2 };
        canvas.draw_sprite(Sprite::Artifact, Rect::new(10.0, 5.0, 12.0, 12.0));
        let cell = buf.get(1, 0);
        assert_eq!(cell.ch, '◆');
        assert_eq!(cell.bg, Color::Blue);
    }

    #[test]
    fn off_canvas_sprites_are_dropped() {
        let mut buf = FrameBuffer::new(4, 2);
        let mut canvas = Canvas { buf: &mut buf, top: 0, rows: 2 };
        canvas.draw_sprite(Sprite::Pursuer { stuck: false }, Rect::new(-100.0, 0.0, 28.0, 28.0));
        assert!(buf.cells.iter().all(|c| *c == Cell::BLANK));
    }
}
