// Asset access. Archives and CG codecs proper are external concerns; the
// engine consumes a name -> bytes source plus one decoded-CG container
// format. The directory source stands in for the original archive reader.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub trait AssetSource {
    fn load(&mut self, name: &str) -> Option<Vec<u8>>;
}

pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: PathBuf) -> Self {
        DirSource { root }
    }
}

impl AssetSource for DirSource {
    fn load(&mut self, name: &str) -> Option<Vec<u8>> {
        for candidate in [
            name.to_string(),
            name.to_ascii_uppercase(),
            name.to_ascii_lowercase(),
        ]
        .iter()
        {
            if let Ok(data) = fs::read(self.root.join(candidate)) {
                return Some(data);
            }
        }
        None
    }
}

// In-memory source for tests and tooling.
#[derive(Default)]
pub struct MemSource {
    files: HashMap<String, Vec<u8>>,
}

impl MemSource {
    pub fn new() -> Self {
        MemSource::default()
    }

    pub fn insert(&mut self, name: &str, data: Vec<u8>) {
        self.files.insert(name.to_ascii_uppercase(), data);
    }
}

impl AssetSource for MemSource {
    fn load(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.get(&name.to_ascii_uppercase()).cloned()
    }
}

// Decoded CG: metrics in pixels, indexed or direct pixel data, optional
// 256-entry BGRX palette.
pub struct Cg {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
    pub px: usize,
    pub palette: Option<Box<[u8; 1024]>>,
    pub pixels: Vec<u8>,
}

const CG_HAS_PALETTE: u8 = 0x01;

// Container layout: x, y, w, h as LE words, then bpp byte and a flags byte,
// then the palette when flagged, then w*h*(bpp/8) pixel bytes.
pub fn cg_decode(data: &[u8]) -> Option<Cg> {
    if data.len() < 10 {
        return None;
    }
    let word = |i: usize| u16::from_le_bytes([data[i], data[i + 1]]);
    let (x, y, w, h) = (word(0), word(2), word(4), word(6));
    let bpp = data[8];
    let flags = data[9];
    if w == 0 || h == 0 || (bpp != 8 && bpp != 24) {
        return None;
    }
    let px = bpp as usize / 8;
    let mut off = 10;
    let palette = if flags & CG_HAS_PALETTE != 0 {
        if data.len() < off + 1024 {
            return None;
        }
        let mut pal = Box::new([0u8; 1024]);
        pal.copy_from_slice(&data[off..off + 1024]);
        off += 1024;
        Some(pal)
    } else {
        None
    };
    let size = w as usize * h as usize * px;
    if data.len() < off + size {
        return None;
    }
    Some(Cg {
        x,
        y,
        w,
        h,
        px,
        palette,
        pixels: data[off..off + size].to_vec(),
    })
}

pub struct Assets {
    source: Box<dyn AssetSource>,
    pub mes_name: String,
    pub cg_name: Option<String>,
    pub data_name: Option<String>,
    pub saved_cg_name: Option<String>,
    pub saved_data_name: Option<String>,
}

impl Assets {
    pub fn new(source: Box<dyn AssetSource>) -> Self {
        Assets {
            source,
            mes_name: String::new(),
            cg_name: None,
            data_name: None,
            saved_cg_name: None,
            saved_data_name: None,
        }
    }

    pub fn load_mes(&mut self, name: &str) -> Option<Vec<u8>> {
        let data = self.source.load(name)?;
        self.mes_name = name.to_ascii_uppercase();
        Some(data)
    }

    pub fn load_data(&mut self, name: &str) -> Option<Vec<u8>> {
        let data = self.source.load(name)?;
        self.data_name = Some(name.to_ascii_uppercase());
        Some(data)
    }

    pub fn load_cg(&mut self, name: &str) -> Option<Vec<u8>> {
        let data = self.source.load(name)?;
        self.cg_name = Some(name.to_ascii_uppercase());
        Some(data)
    }

    pub fn snapshot_names(&mut self) {
        self.saved_cg_name = self.cg_name.clone();
        self.saved_data_name = self.data_name.clone();
    }
}

pub fn cg_encode(cg: &Cg) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&cg.x.to_le_bytes());
    out.extend_from_slice(&cg.y.to_le_bytes());
    out.extend_from_slice(&cg.w.to_le_bytes());
    out.extend_from_slice(&cg.h.to_le_bytes());
    out.push((cg.px * 8) as u8);
    out.push(if cg.palette.is_some() { CG_HAS_PALETTE } else { 0 });
    if let Some(pal) = &cg.palette {
        out.extend_from_slice(&pal[..]);
    }
    out.extend_from_slice(&cg.pixels);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cg_container_round_trip() {
        let cg = Cg {
            x: 8,
            y: 16,
            w: 2,
            h: 2,
            px: 1,
            palette: Some(Box::new([3u8; 1024])),
            pixels: vec![1, 2, 3, 4],
        };
        let bytes = cg_encode(&cg);
        let back = cg_decode(&bytes).unwrap();
        assert_eq!((back.x, back.y, back.w, back.h), (8, 16, 2, 2));
        assert_eq!(back.pixels, vec![1, 2, 3, 4]);
        assert!(back.palette.is_some());
    }

    #[test]
    fn truncated_cg_is_rejected() {
        let cg = Cg {
            x: 0,
            y: 0,
            w: 4,
            h: 4,
            px: 3,
            palette: None,
            pixels: vec![0; 48],
        };
        let mut bytes = cg_encode(&cg);
        bytes.truncate(20);
        assert!(cg_decode(&bytes).is_none());
    }
}
