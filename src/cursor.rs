// Mouse cursor: position tracked from the input device, sprite loaded from
// a CG asset, drawn last onto the framebuffer. Position setting is virtual;
// the host pointer is never warped.

use crate::asset::{cg_decode, Assets};
use crate::input::Input;
use log::warn;

struct Sprite {
    w: usize,
    h: usize,
    // 0 marks a transparent pixel
    pixels: Vec<u32>,
}

pub struct Cursor {
    visible: bool,
    x: i32,
    y: i32,
    sprite: Option<Sprite>,
    loaded_no: Option<u32>,
}

impl Cursor {
    pub fn new() -> Self {
        Cursor { visible: true, x: 0, y: 0, sprite: None, loaded_no: None }
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn set_pos(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    pub fn pos(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn track(&mut self, input: &Input) {
        let (x, y) = input.cursor_pos();
        self.x = x;
        self.y = y;
    }

    pub fn load(&mut self, no: u32, assets: &mut Assets) {
        let name = format!("CURSOR{}.CG", no);
        let data = match assets.load_cg(&name) {
            Some(data) => data,
            None => {
                warn!("Failed to load cursor CG \"{}\"", name);
                return;
            }
        };
        let cg = match cg_decode(&data) {
            Some(cg) => cg,
            None => {
                warn!("Failed to decode cursor CG \"{}\"", name);
                return;
            }
        };
        let w = cg.w as usize;
        let h = cg.h as usize;
        let mut pixels = vec![0u32; w * h];
        for i in 0..w * h {
            let v = match cg.px {
                3 => {
                    let p = &cg.pixels[i * 3..i * 3 + 3];
                    ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32
                }
                _ => {
                    let idx = cg.pixels[i] as usize;
                    if idx == 0 {
                        continue;
                    }
                    match &cg.palette {
                        Some(pal) => {
                            let e = idx * 4;
                            ((pal[e + 2] as u32) << 16)
                                | ((pal[e + 1] as u32) << 8)
                                | pal[e] as u32
                        }
                        None => 0xffffff,
                    }
                }
            };
            pixels[i] = v;
        }
        self.sprite = Some(Sprite { w, h, pixels });
        self.loaded_no = Some(no);
    }

    pub fn reload(&mut self, assets: &mut Assets) {
        if let Some(no) = self.loaded_no {
            self.load(no, assets);
        }
    }

    pub fn unload(&mut self) {
        self.sprite = None;
    }

    pub fn draw(&self, framebuf: &mut [u32], view_w: usize, view_h: usize) {
        if !self.visible {
            return;
        }
        match &self.sprite {
            Some(sprite) => {
                for row in 0..sprite.h {
                    let y = self.y + row as i32;
                    if y < 0 || y as usize >= view_h {
                        continue;
                    }
                    for col in 0..sprite.w {
                        let x = self.x + col as i32;
                        if x < 0 || x as usize >= view_w {
                            continue;
                        }
                        let p = sprite.pixels[row * sprite.w + col];
                        if p != 0 {
                            framebuf[y as usize * view_w + x as usize] = p;
                        }
                    }
                }
            }
            None => {
                // fallback crosshair
                for d in -3i32..=3 {
                    let (x, y) = (self.x + d, self.y);
                    if x >= 0 && (x as usize) < view_w && y >= 0 && (y as usize) < view_h {
                        framebuf[y as usize * view_w + x as usize] = 0xffffff;
                    }
                    let (x, y) = (self.x, self.y + d);
                    if x >= 0 && (x as usize) < view_w && y >= 0 && (y as usize) < view_h {
                        framebuf[y as usize * view_w + x as usize] = 0xffffff;
                    }
                }
            }
        }
    }
}
