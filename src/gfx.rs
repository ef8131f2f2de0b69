// Layered off-screen surfaces plus the window backend. Surfaces are plain
// byte planes (8bpp indexed or 24bpp RGB); the bytecode addresses them by
// index and all rectangle arguments arrive here already converted to pixels.
// The framebuffer shown in the window is composed on every flush from the
// screen surface, the text overlay and the cursor sprite.

use crate::asset::Cg;
use crate::cursor::Cursor;
use crate::error::{Result, VmError};
use crate::game::GAME_NR_SURFACES;
use log::warn;
use minifb::{Window, WindowOptions};
use std::time::Duration;

pub const DEFAULT_VIEW_WIDTH: usize = 640;
pub const DEFAULT_VIEW_HEIGHT: usize = 480;

pub struct Surface {
    pub w: usize,
    pub h: usize,
    // bytes per pixel: 1 (indexed) or 3 (RGB24); the overlay uses 4 (RGBA)
    pub px: usize,
    pub pixels: Vec<u8>,
}

impl Surface {
    fn new(w: usize, h: usize, px: usize) -> Self {
        Surface { w, h, px, pixels: vec![0; w * h * px] }
    }

    pub fn pitch(&self) -> usize {
        self.w * self.px
    }
}

// Clip a rectangle against surface bounds; returns None when nothing is left.
fn clip(surf: &Surface, x: i32, y: i32, w: i32, h: i32) -> Option<(usize, usize, usize, usize)> {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(surf.w as i32);
    let y1 = (y + h).min(surf.h as i32);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as usize, y0 as usize, (x1 - x0) as usize, (y1 - y0) as usize))
}

pub struct Gfx {
    surfaces: Vec<Surface>,
    overlay: Surface,
    screen: usize,
    view_w: usize,
    view_h: usize,
    palette: [u8; 1024],
    text_bg: u8,
    text_fg: u8,
    font_size: u16,
    screen_hidden: bool,
    display_level: f32,
    window: Option<Window>,
    framebuf: Vec<u32>,
    dirty: bool,
    font_warned: bool,
}

impl Gfx {
    pub fn new(sizes: &[(u16, u16); GAME_NR_SURFACES], bpp: u32, windowed: bool) -> Result<Gfx> {
        let px = if bpp == 24 { 3 } else { 1 };
        let mut surfaces = Vec::new();
        for &(w, h) in sizes.iter() {
            if w == 0 || h == 0 {
                break;
            }
            surfaces.push(Surface::new(w as usize, h as usize, px));
        }
        let (view_w, view_h) = if surfaces.is_empty() {
            (DEFAULT_VIEW_WIDTH, DEFAULT_VIEW_HEIGHT)
        } else {
            (surfaces[0].w, surfaces[0].h)
        };
        let window = if windowed {
            let mut window = Window::new("ai5vm", view_w, view_h, WindowOptions::default())
                .map_err(|e| VmError::Window(e.to_string()))?;
            window.limit_update_rate(Some(Duration::from_micros(16600)));
            Some(window)
        } else {
            None
        };
        Ok(Gfx {
            overlay: Surface::new(view_w, view_h, 4),
            surfaces,
            screen: 0,
            view_w,
            view_h,
            palette: [0; 1024],
            text_bg: 0,
            text_fg: 15,
            font_size: 16,
            screen_hidden: false,
            display_level: 1.0,
            window,
            framebuf: vec![0; view_w * view_h],
            dirty: true,
            font_warned: false,
        })
    }

    pub fn view_size(&self) -> (usize, usize) {
        (self.view_w, self.view_h)
    }

    pub fn nr_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    pub fn check_surface(&self, i: usize) -> Result<()> {
        if i >= self.surfaces.len() {
            return Err(VmError::InvalidSurface(i as u32));
        }
        Ok(())
    }

    pub fn surface(&self, i: usize) -> Result<&Surface> {
        self.check_surface(i)?;
        Ok(&self.surfaces[i])
    }

    pub fn surface_mut(&mut self, i: usize) -> Result<&mut Surface> {
        self.check_surface(i)?;
        self.dirty = true;
        Ok(&mut self.surfaces[i])
    }

    pub fn overlay_mut(&mut self) -> &mut Surface {
        self.dirty = true;
        &mut self.overlay
    }

    pub fn window_mut(&mut self) -> Option<&mut Window> {
        self.window.as_mut()
    }

    pub fn set_screen_surface(&mut self, i: usize) -> Result<()> {
        self.check_surface(i)?;
        self.screen = i;
        self.dirty = true;
        Ok(())
    }

    pub fn screen_surface(&self) -> usize {
        self.screen
    }

    pub fn dirty(&mut self) {
        self.dirty = true;
    }

    // ---- text state -------------------------------------------------------

    pub fn text_set_colors(&mut self, bg: u8, fg: u8) {
        self.text_bg = bg;
        self.text_fg = fg;
    }

    pub fn text_colors(&self) -> (u8, u8) {
        (self.text_bg, self.text_fg)
    }

    pub fn text_set_size(&mut self, size: u16) {
        self.font_size = size;
    }

    // The stock glyph path needs a host font the engine does not ship; the
    // titles that matter render through their own bitmap fonts instead.
    pub fn draw_glyph(&mut self, _x: i32, _y: i32, surface: usize, _ch: u16) -> Result<()> {
        self.check_surface(surface)?;
        if !self.font_warned {
            warn!("No host font loaded; glyphs are not drawn");
            self.font_warned = true;
        }
        Ok(())
    }

    // ---- rectangle operations ---------------------------------------------

    pub fn copy(
        &mut self,
        sx: i32,
        sy: i32,
        w: i32,
        h: i32,
        src_i: usize,
        dx: i32,
        dy: i32,
        dst_i: usize,
    ) -> Result<()> {
        self.check_surface(src_i)?;
        self.check_surface(dst_i)?;
        let px = self.surfaces[src_i].px;
        let Some((sx, sy, w, h)) = clip(&self.surfaces[src_i], sx, sy, w, h) else {
            return Ok(());
        };
        let rows = self.read_rect(src_i, sx, sy, w, h);
        self.write_rect(dst_i, dx, dy, w, h, px, &rows);
        Ok(())
    }

    pub fn copy_masked(
        &mut self,
        sx: i32,
        sy: i32,
        w: i32,
        h: i32,
        src_i: usize,
        dx: i32,
        dy: i32,
        dst_i: usize,
        mask_color: u16,
    ) -> Result<()> {
        self.check_surface(src_i)?;
        self.check_surface(dst_i)?;
        let px = self.surfaces[src_i].px;
        let Some((sx, sy, w, h)) = clip(&self.surfaces[src_i], sx, sy, w, h) else {
            return Ok(());
        };
        let rows = self.read_rect(src_i, sx, sy, w, h);
        let mask = mask_color as u8;
        self.write_rect_if(dst_i, dx, dy, w, h, px, &rows, |p| {
            !p.iter().all(|&b| b == mask)
        });
        Ok(())
    }

    // exchange two equally sized rectangles
    pub fn copy_swap(
        &mut self,
        sx: i32,
        sy: i32,
        w: i32,
        h: i32,
        src_i: usize,
        dx: i32,
        dy: i32,
        dst_i: usize,
    ) -> Result<()> {
        self.check_surface(src_i)?;
        self.check_surface(dst_i)?;
        let px = self.surfaces[src_i].px;
        let Some((sx, sy, w, h)) = clip(&self.surfaces[src_i], sx, sy, w, h) else {
            return Ok(());
        };
        let src_rows = self.read_rect(src_i, sx, sy, w, h);
        let Some((dx_c, dy_c, _, _)) = clip(&self.surfaces[dst_i], dx, dy, w as i32, h as i32)
        else {
            return Ok(());
        };
        let dst_rows = self.read_rect(dst_i, dx_c, dy_c, w, h);
        self.write_rect(dst_i, dx, dy, w, h, px, &src_rows);
        self.write_rect(src_i, sx as i32, sy as i32, w, h, px, &dst_rows);
        Ok(())
    }

    pub fn fill(&mut self, x: i32, y: i32, w: i32, h: i32, i: usize, color: u8) -> Result<()> {
        let surf = self.surface_mut(i)?;
        let Some((x, y, w, h)) = clip(surf, x, y, w, h) else {
            return Ok(());
        };
        let px = surf.px;
        let pitch = surf.pitch();
        for row in y..y + h {
            let line = &mut surf.pixels[row * pitch + x * px..row * pitch + (x + w) * px];
            for b in line.iter_mut() {
                *b = color;
            }
        }
        Ok(())
    }

    pub fn text_fill(&mut self, x: i32, y: i32, w: i32, h: i32, i: usize) -> Result<()> {
        let bg = self.text_bg;
        self.fill(x, y, w, h, i, bg)
    }

    pub fn swap_colors(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        i: usize,
        c1: u8,
        c2: u8,
    ) -> Result<()> {
        let surf = self.surface_mut(i)?;
        let Some((x, y, w, h)) = clip(surf, x, y, w, h) else {
            return Ok(());
        };
        let px = surf.px;
        let pitch = surf.pitch();
        for row in y..y + h {
            for col in x..x + w {
                let off = row * pitch + col * px;
                let p = &mut surf.pixels[off..off + px];
                if p.iter().all(|&b| b == c1) {
                    for b in p.iter_mut() {
                        *b = c2;
                    }
                } else if p.iter().all(|&b| b == c2) {
                    for b in p.iter_mut() {
                        *b = c1;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn text_swap_colors(&mut self, x: i32, y: i32, w: i32, h: i32, i: usize) -> Result<()> {
        let (bg, fg) = (self.text_bg, self.text_fg);
        self.swap_colors(x, y, w, h, i, bg, fg)
    }

    pub fn invert_colors(&mut self, x: i32, y: i32, w: i32, h: i32, i: usize) -> Result<()> {
        let surf = self.surface_mut(i)?;
        let Some((x, y, w, h)) = clip(surf, x, y, w, h) else {
            return Ok(());
        };
        let px = surf.px;
        let pitch = surf.pitch();
        for row in y..y + h {
            let line = &mut surf.pixels[row * pitch + x * px..row * pitch + (x + w) * px];
            for b in line.iter_mut() {
                *b = !*b;
            }
        }
        Ok(())
    }

    // dst = fg, with mask-colored fg pixels replaced by bg
    pub fn compose(
        &mut self,
        fg_x: i32,
        fg_y: i32,
        w: i32,
        h: i32,
        fg_i: usize,
        bg_x: i32,
        bg_y: i32,
        bg_i: usize,
        dst_x: i32,
        dst_y: i32,
        dst_i: usize,
        mask_color: u16,
    ) -> Result<()> {
        self.check_surface(fg_i)?;
        self.check_surface(bg_i)?;
        self.check_surface(dst_i)?;
        let px = self.surfaces[fg_i].px;
        let Some((fg_x, fg_y, w, h)) = clip(&self.surfaces[fg_i], fg_x, fg_y, w, h) else {
            return Ok(());
        };
        let fg = self.read_rect(fg_i, fg_x, fg_y, w, h);
        let Some((bg_x, bg_y, _, _)) = clip(&self.surfaces[bg_i], bg_x, bg_y, w as i32, h as i32)
        else {
            return Ok(());
        };
        let bg = self.read_rect(bg_i, bg_x, bg_y, w, h);
        let mask = mask_color as u8;
        let mut out = fg;
        for (o, b) in out.chunks_exact_mut(px).zip(bg.chunks_exact(px)) {
            if o.iter().all(|&v| v == mask) {
                o.copy_from_slice(b);
            }
        }
        self.write_rect(dst_i, dst_x, dst_y, w, h, px, &out);
        Ok(())
    }

    // 50/50 average of src over dst
    pub fn blend(
        &mut self,
        sx: i32,
        sy: i32,
        w: i32,
        h: i32,
        src_i: usize,
        dx: i32,
        dy: i32,
        dst_i: usize,
        masked: bool,
        mask_color: u16,
    ) -> Result<()> {
        self.check_surface(src_i)?;
        self.check_surface(dst_i)?;
        let px = self.surfaces[src_i].px;
        let Some((sx, sy, w, h)) = clip(&self.surfaces[src_i], sx, sy, w, h) else {
            return Ok(());
        };
        let src = self.read_rect(src_i, sx, sy, w, h);
        let Some((dx_c, dy_c, _, _)) = clip(&self.surfaces[dst_i], dx, dy, w as i32, h as i32)
        else {
            return Ok(());
        };
        let dst = self.read_rect(dst_i, dx_c, dy_c, w, h);
        let mask = mask_color as u8;
        let mut out = dst;
        for (o, s) in out.chunks_exact_mut(px).zip(src.chunks_exact(px)) {
            if masked && s.iter().all(|&v| v == mask) {
                continue;
            }
            for (ob, sb) in o.iter_mut().zip(s.iter()) {
                *ob = (((*ob as u32) + (*sb as u32)) / 2) as u8;
            }
        }
        self.write_rect(dst_i, dx, dy, w, h, px, &out);
        Ok(())
    }

    // progressive wipes; the frame is flushed between stripes so the effect
    // is visible at all
    pub fn fade_down(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        dst_i: usize,
        src_i: Option<usize>,
        cursor: &Cursor,
    ) -> Result<()> {
        const STRIPE: i32 = 8;
        let mut row = 0;
        while row < h {
            let sh = STRIPE.min(h - row);
            match src_i {
                Some(src) => self.copy(x, y + row, w, sh, src, x, y + row, dst_i)?,
                None => self.fill(x, y + row, w, sh, dst_i, 0)?,
            }
            self.update(cursor)?;
            row += STRIPE;
        }
        Ok(())
    }

    pub fn fade_right(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        dst_i: usize,
        src_i: Option<usize>,
        cursor: &Cursor,
    ) -> Result<()> {
        const STRIPE: i32 = 8;
        let mut col = 0;
        while col < w {
            let sw = STRIPE.min(w - col);
            match src_i {
                Some(src) => self.copy(x + col, y, sw, h, src, x + col, y, dst_i)?,
                None => self.fill(x + col, y, sw, h, dst_i, 0)?,
            }
            self.update(cursor)?;
            col += STRIPE;
        }
        Ok(())
    }

    pub fn pixelate(&mut self, x: i32, y: i32, w: i32, h: i32, i: usize, mag: u32) -> Result<()> {
        if mag < 2 {
            return Ok(());
        }
        let surf = self.surface_mut(i)?;
        let Some((x, y, w, h)) = clip(surf, x, y, w, h) else {
            return Ok(());
        };
        let px = surf.px;
        let pitch = surf.pitch();
        let mag = mag as usize;
        let mut by = 0;
        while by < h {
            let mut bx = 0;
            while bx < w {
                let sample_off = (y + by) * pitch + (x + bx) * px;
                let sample: Vec<u8> = surf.pixels[sample_off..sample_off + px].to_vec();
                for row in by..(by + mag).min(h) {
                    for col in bx..(bx + mag).min(w) {
                        let off = (y + row) * pitch + (x + col) * px;
                        surf.pixels[off..off + px].copy_from_slice(&sample);
                    }
                }
                bx += mag;
            }
            by += mag;
        }
        Ok(())
    }

    pub fn draw_cg(&mut self, i: usize, cg: &Cg) -> Result<()> {
        self.check_surface(i)?;
        let dst_px = self.surfaces[i].px;
        let w = cg.w as usize;
        let h = cg.h as usize;
        let mut rows: Vec<u8> = Vec::with_capacity(w * h * dst_px);
        if cg.px == dst_px {
            rows.extend_from_slice(&cg.pixels[..(w * h * cg.px).min(cg.pixels.len())]);
        } else if cg.px == 1 && dst_px == 3 {
            // expand indexed pixels through the CG's own palette
            let pal = match &cg.palette {
                Some(p) => &p[..],
                None => {
                    warn!("Indexed CG without palette on a direct-color surface");
                    return Ok(());
                }
            };
            for &idx in cg.pixels.iter().take(w * h) {
                let e = idx as usize * 4;
                // palette entries are BGRX
                rows.push(pal[e + 2]);
                rows.push(pal[e + 1]);
                rows.push(pal[e]);
            }
        } else {
            warn!("CG pixel format does not match surface {}", i);
            return Ok(());
        }
        self.write_rect(i, cg.x as i32, cg.y as i32, w, h, dst_px, &rows);
        Ok(())
    }

    // ---- palette ----------------------------------------------------------

    pub fn palette_set(&mut self, data: &[u8]) {
        let n = data.len().min(1024);
        self.palette[..n].copy_from_slice(&data[..n]);
        self.dirty = true;
    }

    pub fn palette(&self) -> &[u8; 1024] {
        &self.palette
    }

    pub fn palette_crossfade(&mut self, target: &[u8], ms: u32, cursor: &Cursor) -> Result<()> {
        let mut goal = [0u8; 1024];
        let n = target.len().min(1024);
        goal[..n].copy_from_slice(&target[..n]);
        self.crossfade_steps(goal, ms, cursor)
    }

    pub fn palette_crossfade_to(
        &mut self,
        r: u8,
        g: u8,
        b: u8,
        ms: u32,
        cursor: &Cursor,
    ) -> Result<()> {
        let mut goal = [0u8; 1024];
        for e in goal.chunks_exact_mut(4) {
            e[0] = b;
            e[1] = g;
            e[2] = r;
        }
        self.crossfade_steps(goal, ms, cursor)
    }

    fn crossfade_steps(&mut self, goal: [u8; 1024], ms: u32, cursor: &Cursor) -> Result<()> {
        let start = self.palette;
        let steps = (ms / 16).max(1);
        for s in 1..=steps {
            for i in 0..1024 {
                let a = start[i] as i32;
                let b = goal[i] as i32;
                self.palette[i] = (a + (b - a) * s as i32 / steps as i32) as u8;
            }
            self.dirty = true;
            self.update(cursor)?;
            std::thread::sleep(Duration::from_millis(16));
        }
        Ok(())
    }

    pub fn hide_screen(&mut self) {
        self.screen_hidden = true;
        self.dirty = true;
    }

    pub fn unhide_screen(&mut self) {
        self.screen_hidden = false;
        self.dirty = true;
    }

    pub fn display_hide(&mut self) {
        self.display_level = 0.0;
        self.dirty = true;
    }

    pub fn display_unhide(&mut self) {
        self.display_level = 1.0;
        self.dirty = true;
    }

    // level 0..=15 maps to fully shown..fully dark
    pub fn display_fade_out(&mut self, level: u32) {
        self.display_level = 1.0 - (level.min(15) as f32 / 15.0);
        self.dirty = true;
    }

    pub fn display_fade_in(&mut self) {
        self.display_level = 1.0;
        self.dirty = true;
    }

    // ---- frame composition ------------------------------------------------

    pub fn update(&mut self, cursor: &Cursor) -> Result<()> {
        if !self.dirty && self.window.is_none() {
            return Ok(());
        }
        self.compose_framebuf(cursor);
        self.dirty = false;
        if let Some(window) = self.window.as_mut() {
            window
                .update_with_buffer(&self.framebuf, self.view_w, self.view_h)
                .map_err(|e| VmError::Window(e.to_string()))?;
        }
        Ok(())
    }

    fn compose_framebuf(&mut self, cursor: &Cursor) {
        let screen = &self.surfaces[self.screen];
        for row in 0..self.view_h.min(screen.h) {
            for col in 0..self.view_w.min(screen.w) {
                let v = if self.screen_hidden {
                    0
                } else {
                    let off = row * screen.pitch() + col * screen.px;
                    match screen.px {
                        3 => {
                            let p = &screen.pixels[off..off + 3];
                            ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32
                        }
                        _ => {
                            let e = screen.pixels[off] as usize * 4;
                            ((self.palette[e + 2] as u32) << 16)
                                | ((self.palette[e + 1] as u32) << 8)
                                | self.palette[e] as u32
                        }
                    }
                };
                self.framebuf[row * self.view_w + col] = v;
            }
        }
        // text overlay (straight alpha)
        for row in 0..self.view_h {
            for col in 0..self.view_w {
                let off = (row * self.overlay.w + col) * 4;
                let a = self.overlay.pixels[off + 3] as u32;
                if a == 0 {
                    continue;
                }
                let fb = &mut self.framebuf[row * self.view_w + col];
                let (br, bg, bb) = ((*fb >> 16) & 0xff, (*fb >> 8) & 0xff, *fb & 0xff);
                let (or, og, ob) = (
                    self.overlay.pixels[off] as u32,
                    self.overlay.pixels[off + 1] as u32,
                    self.overlay.pixels[off + 2] as u32,
                );
                let inv = 255 - a;
                *fb = ((((or * a + br * inv) / 255) & 0xff) << 16)
                    | ((((og * a + bg * inv) / 255) & 0xff) << 8)
                    | (((ob * a + bb * inv) / 255) & 0xff);
            }
        }
        cursor.draw(&mut self.framebuf, self.view_w, self.view_h);
        if self.display_level < 1.0 {
            let level = (self.display_level * 256.0) as u32;
            for v in self.framebuf.iter_mut() {
                let (r, g, b) = ((*v >> 16) & 0xff, (*v >> 8) & 0xff, *v & 0xff);
                *v = (((r * level / 256) & 0xff) << 16)
                    | (((g * level / 256) & 0xff) << 8)
                    | ((b * level / 256) & 0xff);
            }
        }
    }

    // ---- internal rect plumbing -------------------------------------------

    fn read_rect(&self, i: usize, x: usize, y: usize, w: usize, h: usize) -> Vec<u8> {
        let surf = &self.surfaces[i];
        let px = surf.px;
        let pitch = surf.pitch();
        let mut out = vec![0; w * h * px];
        for row in 0..h {
            if y + row >= surf.h {
                break;
            }
            let cols = w.min(surf.w.saturating_sub(x));
            let src = (y + row) * pitch + x * px;
            out[row * w * px..row * w * px + cols * px]
                .copy_from_slice(&surf.pixels[src..src + cols * px]);
        }
        out
    }

    fn write_rect(&mut self, i: usize, x: i32, y: i32, w: usize, h: usize, px: usize, rows: &[u8]) {
        self.write_rect_if(i, x, y, w, h, px, rows, |_| true)
    }

    fn write_rect_if<F: Fn(&[u8]) -> bool>(
        &mut self,
        i: usize,
        x: i32,
        y: i32,
        w: usize,
        h: usize,
        px: usize,
        rows: &[u8],
        keep: F,
    ) {
        self.dirty = true;
        let surf = &mut self.surfaces[i];
        let pitch = surf.pitch();
        for row in 0..h {
            let dy = y + row as i32;
            if dy < 0 || dy as usize >= surf.h {
                continue;
            }
            for col in 0..w {
                let dx = x + col as i32;
                if dx < 0 || dx as usize >= surf.w {
                    continue;
                }
                let src = &rows[(row * w + col) * px..(row * w + col + 1) * px];
                if !keep(src) {
                    continue;
                }
                let off = dy as usize * pitch + dx as usize * px;
                surf.pixels[off..off + px].copy_from_slice(src);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;

    fn gfx() -> Gfx {
        let mut sizes = [(0u16, 0u16); GAME_NR_SURFACES];
        sizes[0] = (64, 64);
        sizes[1] = (64, 64);
        Gfx::new(&sizes, 8, false).unwrap()
    }

    #[test]
    fn copy_moves_pixels_between_surfaces() {
        let mut g = gfx();
        g.fill(0, 0, 4, 4, 1, 7).unwrap();
        g.copy(0, 0, 4, 4, 1, 10, 10, 0).unwrap();
        assert_eq!(g.surface(0).unwrap().pixels[10 * 64 + 10], 7);
        assert_eq!(g.surface(0).unwrap().pixels[9 * 64 + 10], 0);
    }

    #[test]
    fn masked_copy_skips_mask_color() {
        let mut g = gfx();
        g.fill(0, 0, 2, 1, 1, 5).unwrap();
        g.fill(2, 0, 2, 1, 1, 9).unwrap();
        g.fill(0, 0, 64, 64, 0, 1).unwrap();
        g.copy_masked(0, 0, 4, 1, 1, 0, 0, 0, 9).unwrap();
        let s = g.surface(0).unwrap();
        assert_eq!(&s.pixels[0..4], &[5, 5, 1, 1]);
    }

    #[test]
    fn copy_swap_exchanges_rects() {
        let mut g = gfx();
        g.fill(0, 0, 2, 2, 0, 3).unwrap();
        g.fill(0, 0, 2, 2, 1, 8).unwrap();
        g.copy_swap(0, 0, 2, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(g.surface(0).unwrap().pixels[0], 8);
        assert_eq!(g.surface(1).unwrap().pixels[0], 3);
    }

    #[test]
    fn operations_clip_to_surface_bounds() {
        let mut g = gfx();
        g.fill(60, 60, 10, 10, 0, 2).unwrap();
        g.copy(60, 60, 10, 10, 0, -2, -2, 1).unwrap();
        assert_eq!(g.surface(1).unwrap().pixels[0], 2);
    }

    #[test]
    fn invalid_surface_index_is_fatal() {
        let mut g = gfx();
        assert!(g.fill(0, 0, 1, 1, 9, 0).is_err());
        assert!(g.set_screen_surface(9).is_err());
    }

    #[test]
    fn crossfade_reaches_target() {
        let mut g = gfx();
        let target = [0x40u8; 1024];
        g.palette_crossfade(&target, 32, &Cursor::new()).unwrap();
        assert_eq!(g.palette()[0], 0x40);
        assert_eq!(g.palette()[1023], 0x40);
    }
}
