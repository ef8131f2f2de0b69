// FLAGnn save slots. Every operation is a flat read or write of some span of
// the raw memory image; there is no serialization format beyond the image
// layout itself. Slot files live in the configured save directory.

use crate::error::{Result, VmError};
use crate::memory::{Memory, MEMORY_MES_NAME_SIZE};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub struct SaveData {
    dir: PathBuf,
}

pub fn save_name(no: u32) -> Result<String> {
    if no > 99 {
        return Err(VmError::InvalidSaveNumber(no));
    }
    Ok(format!("FLAG{:02}", no))
}

fn io_err(name: &str, source: std::io::Error) -> VmError {
    VmError::SaveIo { name: name.to_string(), source }
}

impl SaveData {
    pub fn new(dir: PathBuf) -> Self {
        SaveData { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read_slot(&self, name: &str) -> Option<Vec<u8>> {
        match fs::read(self.path(name)) {
            Ok(data) => Some(data),
            Err(_) => {
                warn!("Save slot \"{}\" does not exist", name);
                None
            }
        }
    }

    fn write_slot(&self, name: &str, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| io_err(name, e))?;
        fs::write(self.path(name), data).map_err(|e| io_err(name, e))
    }

    // ---- full resume state ------------------------------------------------

    pub fn resume_save(&self, mem: &Memory, name: &str) -> Result<()> {
        let data = mem.bytes(0, mem.save_region())?;
        self.write_slot(name, data)
    }

    // Restores the raw region; the caller re-derives the pointer table and
    // reloads the MES named inside the restored image.
    pub fn resume_load(&self, mem: &mut Memory, name: &str) -> Result<bool> {
        let data = match self.read_slot(name) {
            Some(data) => data,
            None => return Ok(false),
        };
        let n = data.len().min(mem.save_region());
        mem.bytes_mut(0, n)?.copy_from_slice(&data[..n]);
        Ok(true)
    }

    // ---- variable banks only ----------------------------------------------

    fn vars_span(mem: &Memory) -> (usize, usize) {
        (MEMORY_MES_NAME_SIZE, mem.mem16_off() - MEMORY_MES_NAME_SIZE)
    }

    pub fn save(&self, mem: &Memory, name: &str) -> Result<()> {
        let (off, len) = Self::vars_span(mem);
        self.write_slot(name, mem.bytes(off, len)?)
    }

    pub fn load(&self, mem: &mut Memory, name: &str) -> Result<()> {
        let Some(data) = self.read_slot(name) else { return Ok(()) };
        let (off, len) = Self::vars_span(mem);
        let n = data.len().min(len);
        mem.bytes_mut(off, n)?.copy_from_slice(&data[..n]);
        Ok(())
    }

    // ---- nibble bank ------------------------------------------------------

    fn var4_span(mem: &Memory) -> (usize, usize) {
        (mem.ptr.var4, mem.var4_size() / 2)
    }

    pub fn save_var4(&self, mem: &Memory, name: &str) -> Result<()> {
        let (off, len) = Self::var4_span(mem);
        self.write_slot(name, mem.bytes(off, len)?)
    }

    pub fn load_var4(&self, mem: &mut Memory, name: &str) -> Result<()> {
        let Some(data) = self.read_slot(name) else { return Ok(()) };
        let (off, len) = Self::var4_span(mem);
        let n = data.len().min(len);
        mem.bytes_mut(off, n)?.copy_from_slice(&data[..n]);
        Ok(())
    }

    // OR-merge the current nibble bank into the slot.
    pub fn save_union_var4(&self, mem: &Memory, name: &str) -> Result<()> {
        let (off, len) = Self::var4_span(mem);
        let current = mem.bytes(off, len)?;
        let mut merged = match fs::read(self.path(name)) {
            Ok(data) => data,
            Err(_) => vec![0; len],
        };
        merged.resize(len, 0);
        for (m, c) in merged.iter_mut().zip(current.iter()) {
            *m |= c;
        }
        self.write_slot(name, &merged)
    }

    // Slices are nibble-cell ranges [from, to), rounded out to bytes.
    fn slice_bytes(from: u32, to: u32, len: usize) -> (usize, usize) {
        let lo = (from as usize / 2).min(len);
        let hi = ((to as usize + 1) / 2).min(len);
        (lo, hi.max(lo))
    }

    pub fn save_var4_slice(&self, mem: &Memory, name: &str, from: u32, to: u32) -> Result<()> {
        let (off, len) = Self::var4_span(mem);
        let (lo, hi) = Self::slice_bytes(from, to, len);
        let mut slot = match fs::read(self.path(name)) {
            Ok(data) => data,
            Err(_) => vec![0; len],
        };
        slot.resize(len, 0);
        slot[lo..hi].copy_from_slice(&mem.bytes(off + lo, hi - lo)?);
        self.write_slot(name, &slot)
    }

    pub fn load_var4_slice(&self, mem: &mut Memory, name: &str, from: u32, to: u32) -> Result<()> {
        let Some(data) = self.read_slot(name) else { return Ok(()) };
        let (off, len) = Self::var4_span(mem);
        let (lo, hi) = Self::slice_bytes(from, to, len.min(data.len()));
        mem.bytes_mut(off + lo, hi - lo)?.copy_from_slice(&data[lo..hi]);
        Ok(())
    }

    // ---- slot management --------------------------------------------------

    pub fn copy(&self, src: &str, dst: &str) -> Result<()> {
        if !Path::new(&self.path(src)).exists() {
            warn!("Save slot \"{}\" does not exist", src);
            return Ok(());
        }
        fs::copy(self.path(src), self.path(dst)).map_err(|e| io_err(dst, e))?;
        Ok(())
    }

    // Rewrite the MES name stored inside a resume slot.
    pub fn set_mes_name(&self, name: &str, mes: &str) -> Result<()> {
        let Some(mut data) = self.read_slot(name) else { return Ok(()) };
        if data.len() < MEMORY_MES_NAME_SIZE {
            warn!("Save slot \"{}\" is too small to hold a MES name", name);
            return Ok(());
        }
        for b in data[..MEMORY_MES_NAME_SIZE].iter_mut() {
            *b = 0;
        }
        for (i, b) in mes.bytes().take(MEMORY_MES_NAME_SIZE - 1).enumerate() {
            data[i] = b.to_ascii_uppercase();
        }
        self.write_slot(name, &data)
    }

    // Semantics undocumented in the engine family; kept as an observable
    // blackbox slot operation.
    pub fn f11(&self, name: &str) {
        info!("savedata f11 on slot \"{}\"", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_names_are_validated() {
        assert_eq!(save_name(0).unwrap(), "FLAG00");
        assert_eq!(save_name(99).unwrap(), "FLAG99");
        assert!(save_name(100).is_err());
    }

    #[test]
    fn var4_round_trips_through_a_slot() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveData::new(dir.path().to_path_buf());
        let mut mem = Memory::new(2048, 4096);
        mem.ptr = mem.default_ptr_table();
        mem.set_var4(10, 7).unwrap();
        saves.save_var4(&mem, "FLAG01").unwrap();
        mem.set_var4(10, 0).unwrap();
        mem.set_var4(11, 3).unwrap();
        saves.load_var4(&mut mem, "FLAG01").unwrap();
        assert_eq!(mem.get_var4(10).unwrap(), 7);
        assert_eq!(mem.get_var4(11).unwrap(), 0);
    }

    #[test]
    fn union_save_merges_nibbles() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveData::new(dir.path().to_path_buf());
        let mut mem = Memory::new(2048, 4096);
        mem.ptr = mem.default_ptr_table();
        mem.set_var4(0, 0b0001).unwrap();
        saves.save_var4(&mem, "FLAG02").unwrap();
        mem.set_var4(0, 0b0100).unwrap();
        saves.save_union_var4(&mem, "FLAG02").unwrap();
        saves.load_var4(&mut mem, "FLAG02").unwrap();
        assert_eq!(mem.get_var4(0).unwrap(), 0b0101);
    }

    #[test]
    fn slice_save_touches_only_the_range() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveData::new(dir.path().to_path_buf());
        let mut mem = Memory::new(2048, 4096);
        mem.ptr = mem.default_ptr_table();
        mem.set_var4(100, 0xf).unwrap();
        mem.set_var4(300, 0xf).unwrap();
        saves.save_var4_slice(&mem, "FLAG03", 100, 200).unwrap();
        mem.set_var4(100, 0).unwrap();
        mem.set_var4(300, 0).unwrap();
        saves.load_var4(&mut mem, "FLAG03").unwrap();
        assert_eq!(mem.get_var4(100).unwrap(), 0xf);
        assert_eq!(mem.get_var4(300).unwrap(), 0);
    }

    #[test]
    fn resume_round_trip_keeps_name_and_vars() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveData::new(dir.path().to_path_buf());
        let mut mem = Memory::new(2048, 4096);
        mem.ptr = mem.default_ptr_table();
        mem.set_mes_name("scene2.mes");
        mem.set_var16(4, 0xbeef).unwrap();
        saves.resume_save(&mem, "FLAG04").unwrap();
        mem.set_mes_name("other.mes");
        mem.set_var16(4, 0).unwrap();
        assert!(saves.resume_load(&mut mem, "FLAG04").unwrap());
        assert_eq!(mem.mes_name(), "SCENE2.MES");
        assert_eq!(mem.get_var16(4).unwrap(), 0xbeef);
    }
}
