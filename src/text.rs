// Bitmap text rendering for titles that ship their own fonts. Glyph lookup
// tables and the mask/color planes live in file_data, loaded there by the
// scripts themselves; this module only resolves offsets and blends pixels.
// Mask values are 4-bit coverage expanded to a byte: 0 transparent, >15
// fully opaque, anything between alpha-blended.

use crate::error::Result;
use crate::memory::{sysvar16, Memory};
use crate::vm::Vm;
use log::warn;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderMode {
    Merged,
    Redscale,
    Separate,
}

pub struct RenderParams {
    pub char_w: usize,
    pub char_h: usize,
    pub surface: usize,
    pub mode: RenderMode,
    // absolute offsets into the memory image
    pub font_tbl: usize,
    pub font_msk: usize,
    pub font_fnt: usize,
    pub font_pal: Option<usize>,
}

// Rows of color data rendered in "separate" mode carry their mask this many
// lines below the cursor; the merge step reads it back from there.
pub const SEPARATE_MASK_ROW_OFFSET: usize = 256;

pub fn get_char_index(mem: &Memory, tbl: usize, ch: u16) -> Option<usize> {
    let size = mem.read_u16(tbl).ok()?;
    for i in 0..size as usize {
        if mem.read_u16(tbl + (i + 1) * 2).ok()? == ch {
            return Some(i);
        }
    }
    None
}

fn glyph_alpha(msk: u8) -> u8 {
    msk.min(15) * 16 - 8
}

fn alpha_blend_rgb_mono(bg: &mut [u8], fg: u8, alpha: u8) {
    let a = alpha as u32 + 1;
    let inv_a = 256 - alpha as u32;
    bg[0] = ((a * fg as u32 + inv_a * bg[0] as u32) >> 8) as u8;
    bg[1] = ((a * fg as u32 + inv_a * bg[1] as u32) >> 8) as u8;
    bg[2] = ((a * fg as u32 + inv_a * bg[2] as u32) >> 8) as u8;
}

// palette colors are stored BGR, surfaces are RGB
fn alpha_blend_rgb_bgr(bg: &mut [u8], fg: &[u8], alpha: u8) {
    let a = alpha as u32 + 1;
    let inv_a = 256 - alpha as u32;
    bg[0] = ((a * fg[2] as u32 + inv_a * bg[0] as u32) >> 8) as u8;
    bg[1] = ((a * fg[1] as u32 + inv_a * bg[1] as u32) >> 8) as u8;
    bg[2] = ((a * fg[0] as u32 + inv_a * bg[2] as u32) >> 8) as u8;
}

pub fn render_text(vm: &mut Vm, text: &[u8], p: &RenderParams) -> Result<()> {
    let mem = &vm.mem;
    let start_x = mem.get_sysvar16(sysvar16::TEXT_START_X) as usize;
    let end_x = mem.get_sysvar16(sysvar16::TEXT_END_X) as usize;
    let char_space = mem.get_sysvar16(sysvar16::CHAR_SPACE) as usize;
    let line_space = mem.get_sysvar16(sysvar16::LINE_SPACE) as usize;
    let mut x = mem.get_sysvar16(sysvar16::TEXT_CURSOR_X) as usize;
    let mut y = mem.get_sysvar16(sysvar16::TEXT_CURSOR_Y) as usize;

    {
        let surf = vm.gfx.surface_mut(p.surface)?;
        if surf.px != 3 {
            warn!("Bitmap text needs a direct-color surface");
            return Ok(());
        }
        let plane = p.char_w * p.char_h;
        let (surf_w, surf_h, pitch) = (surf.w, surf.h, surf.pitch());

        let mut i = 0;
        while i + 1 < text.len() {
            let char_code = u16::from_le_bytes([text[i], text[i + 1]]);
            i += 2;
            let char_i = match get_char_index(mem, p.font_tbl, char_code) {
                Some(idx) => idx,
                None => {
                    warn!("Invalid character: {:04x}", char_code);
                    continue;
                }
            };
            let msk = mem.bytes(p.font_msk + char_i * plane, plane)?;
            let fnt = mem.bytes(p.font_fnt + char_i * plane, plane)?;
            let pal = match p.font_pal {
                Some(off) => Some(mem.bytes(off, 768)?),
                None => None,
            };

            for row in 0..p.char_h {
                if y + row >= surf_h {
                    break;
                }
                for col in 0..p.char_w {
                    if x + col >= surf_w {
                        break;
                    }
                    let m = msk[row * p.char_w + col];
                    let f = fnt[row * p.char_w + col];
                    let off = (y + row) * pitch + (x + col) * 3;
                    let dst = &mut surf.pixels[off..off + 3];
                    match p.mode {
                        RenderMode::Merged => {
                            if m == 0 {
                                continue;
                            }
                            if let Some(pal) = pal {
                                let c = &pal[f as usize * 3..f as usize * 3 + 3];
                                alpha_blend_rgb_bgr(dst, c, glyph_alpha(m));
                            } else if m > 15 {
                                dst[0] = f;
                                dst[1] = f;
                                dst[2] = f;
                            } else {
                                alpha_blend_rgb_mono(dst, f, glyph_alpha(m));
                            }
                        }
                        RenderMode::Redscale => {
                            if m == 0 {
                                continue;
                            }
                            if m > 15 {
                                dst[0] = f;
                            } else {
                                alpha_blend_rgb_mono(dst, f, glyph_alpha(m));
                            }
                            dst[1] = 0;
                            dst[2] = 0;
                        }
                        RenderMode::Separate => {
                            if f != 0 {
                                dst[0] = f;
                                dst[1] = f;
                                dst[2] = f;
                            }
                            let msk_row = y + row + SEPARATE_MASK_ROW_OFFSET;
                            if m != 0 && msk_row < surf_h {
                                let moff = msk_row * pitch + (x + col) * 3;
                                let mdst = &mut surf.pixels[moff..moff + 3];
                                mdst[0] = m;
                                mdst[1] = m;
                                mdst[2] = m;
                            }
                        }
                    }
                }
            }

            x += char_space;
            if x + char_space > end_x {
                y += line_space;
                x = start_x;
            }
        }
    }

    vm.mem.set_sysvar16(sysvar16::TEXT_CURSOR_X, x as u16);
    vm.mem.set_sysvar16(sysvar16::TEXT_CURSOR_Y, y as u16);
    vm.gfx.dirty();
    Ok(())
}

// Merge step for the separate rendering mode: combine the color region with
// its mask region from the scratch surface and write the result onto the
// overlay, where it is composited over the screen at flush time.
pub fn merge_text_planes(
    vm: &mut Vm,
    src_surface: usize,
    rows: usize,
    dst_row: usize,
) -> Result<()> {
    let (cols, color_rows, mask_rows) = {
        let surf = vm.gfx.surface(src_surface)?;
        if surf.px != 3 {
            warn!("Text merge needs a direct-color surface");
            return Ok(());
        }
        let cols = surf.w;
        let rows = rows.min(surf.h.saturating_sub(SEPARATE_MASK_ROW_OFFSET));
        let pitch = surf.pitch();
        let color = surf.pixels[0..rows * pitch].to_vec();
        let mask = surf.pixels
            [SEPARATE_MASK_ROW_OFFSET * pitch..(SEPARATE_MASK_ROW_OFFSET + rows) * pitch]
            .to_vec();
        (cols, color, mask)
    };

    let overlay = vm.gfx.overlay_mut();
    let opitch = overlay.w * overlay.px;
    let stride = cols;
    let cols = cols.min(overlay.w);
    let rows = color_rows.len() / (stride * 3).max(1);
    for row in 0..rows {
        if dst_row + row >= overlay.h {
            break;
        }
        let oline = &mut overlay.pixels[(dst_row + row) * opitch..(dst_row + row + 1) * opitch];
        for col in 0..cols {
            let p = &mut oline[col * 4..col * 4 + 4];
            let fnt = &color_rows[(row * stride + col) * 3..(row * stride + col) * 3 + 3];
            let msk = &mask_rows[(row * stride + col) * 3..(row * stride + col) * 3 + 3];
            if msk[2] == 0 {
                p.copy_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            p[0] = fnt[0];
            p[1] = fnt[1];
            p[2] = fnt[2];
            p[3] = if msk[2] > 15 { 255 } else { glyph_alpha(msk[0]) };
        }
    }
    vm.gfx.dirty();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_contract_saturates() {
        assert_eq!(glyph_alpha(1), 8);
        assert_eq!(glyph_alpha(15), 232);
        assert_eq!(glyph_alpha(200), 232);
    }

    #[test]
    fn glyph_table_lookup_is_linear_scan() {
        let mut mem = Memory::new(2048, 4096);
        mem.ptr = mem.default_ptr_table();
        let tbl = mem.file_data_off();
        mem.write_u16(tbl, 3).unwrap();
        mem.write_u16(tbl + 2, 0x8140).unwrap();
        mem.write_u16(tbl + 4, 0x82a0).unwrap();
        mem.write_u16(tbl + 6, 0x82a2).unwrap();
        assert_eq!(get_char_index(&mem, tbl, 0x82a0), Some(1));
        assert_eq!(get_char_index(&mem, tbl, 0x9999), None);
    }

    #[test]
    fn mono_blend_moves_toward_foreground() {
        let mut bg = [0u8, 0, 0];
        alpha_blend_rgb_mono(&mut bg, 200, 232);
        assert!(bg[0] > 150 && bg[0] == bg[1] && bg[1] == bg[2]);
    }
}
