// Animation streams. Stream definitions live in file_data: a table of
// frame-list offsets at the data offset, each frame a fixed 16-byte copy
// record. Streams advance on a 16 ms tick delivered over a channel from a
// scheduled timer, drained at every peek, so playback progresses on its own
// timebase while the VM runs bytecode.

use crate::error::{Result, VmError};
use crate::gfx::Gfx;
use crate::memory::{sysvar32, Memory};
use std::sync::mpsc::{channel, Receiver};

pub const ANIM_MAX_STREAMS: usize = 100;

// frame record: delay, src/dst surface, src rect, dst position
const FRAME_SIZE: u32 = 16;
const FRAME_LOOP: u16 = 0xffff;
const FRAME_HALT: u16 = 0xfffe;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Uninit,
    Stopped,
    Running,
    Halted,
}

#[derive(Copy, Clone)]
struct Stream {
    state: State,
    base: u32,
    pos: u32,
    wait: u16,
    off_x: i16,
    off_y: i16,
}

const IDLE_STREAM: Stream =
    Stream { state: State::Uninit, base: 0, pos: 0, wait: 0, off_x: 0, off_y: 0 };

struct Ticker {
    _timer: timer::Timer,
    _guard: timer::Guard,
    rx: Receiver<()>,
}

pub struct Anim {
    streams: [Stream; ANIM_MAX_STREAMS],
    ticker: Ticker,
}

impl Anim {
    pub fn new() -> Anim {
        let timer = timer::Timer::new();
        let (tx, rx) = channel();
        let guard = timer.schedule_repeating(chrono::Duration::milliseconds(16), move || {
            let _ = tx.send(());
        });
        Anim {
            streams: [IDLE_STREAM; ANIM_MAX_STREAMS],
            ticker: Ticker { _timer: timer, _guard: guard, rx },
        }
    }

    fn check(no: u32) -> Result<usize> {
        if no as usize >= ANIM_MAX_STREAMS {
            return Err(VmError::InvalidAnimStream(no / 10, no % 10));
        }
        Ok(no as usize)
    }

    // Resolve the stream's frame list through the offset table at the title's
    // data offset.
    pub fn init_stream(&mut self, no: u32, mem: &Memory) -> Result<()> {
        let i = Self::check(no)?;
        let data_off = mem.get_sysvar32(sysvar32::DATA_OFFSET) as usize;
        let table = mem.file_data_off() + data_off;
        let rel = mem.read_u32(table + i * 4)?;
        self.streams[i] = Stream {
            state: State::Stopped,
            base: (mem.file_data_off() as u32) + rel,
            pos: 0,
            wait: 0,
            off_x: 0,
            off_y: 0,
        };
        Ok(())
    }

    pub fn start(&mut self, no: u32) -> Result<()> {
        let i = Self::check(no)?;
        if self.streams[i].state != State::Uninit {
            self.streams[i].state = State::Running;
        }
        Ok(())
    }

    pub fn stop(&mut self, no: u32) -> Result<()> {
        let i = Self::check(no)?;
        if self.streams[i].state != State::Uninit {
            self.streams[i].state = State::Stopped;
            self.streams[i].pos = 0;
            self.streams[i].wait = 0;
        }
        Ok(())
    }

    pub fn halt(&mut self, no: u32) -> Result<()> {
        let i = Self::check(no)?;
        if self.streams[i].state == State::Running {
            self.streams[i].state = State::Halted;
        }
        Ok(())
    }

    pub fn stop_all(&mut self) {
        for s in self.streams.iter_mut() {
            if s.state != State::Uninit {
                s.state = State::Stopped;
                s.pos = 0;
                s.wait = 0;
            }
        }
    }

    pub fn halt_all(&mut self) {
        for s in self.streams.iter_mut() {
            if s.state == State::Running {
                s.state = State::Halted;
            }
        }
    }

    pub fn reset_all(&mut self) {
        self.streams = [IDLE_STREAM; ANIM_MAX_STREAMS];
    }

    pub fn set_offset(&mut self, no: u32, x: i32, y: i32) -> Result<()> {
        let i = Self::check(no)?;
        self.streams[i].off_x = x as i16;
        self.streams[i].off_y = y as i16;
        Ok(())
    }

    pub fn running(&self, no: u32) -> bool {
        (no as usize) < ANIM_MAX_STREAMS && self.streams[no as usize].state == State::Running
    }

    pub fn any_running(&self) -> bool {
        self.streams.iter().any(|s| s.state == State::Running)
    }

    // Execute the stream's current frame copy immediately, ignoring timing.
    pub fn exec_copy_call(&mut self, no: u32, mem: &Memory, gfx: &mut Gfx) -> Result<()> {
        let i = Self::check(no)?;
        if self.streams[i].state == State::Uninit {
            return Ok(());
        }
        let mut stream = self.streams[i];
        Self::exec_frame(&mut stream, mem, gfx)?;
        self.streams[i] = stream;
        Ok(())
    }

    // One frame step; returns without effect on loop/halt markers handled.
    fn exec_frame(stream: &mut Stream, mem: &Memory, gfx: &mut Gfx) -> Result<()> {
        let off = (stream.base + stream.pos) as usize;
        let delay = mem.read_u16(off)?;
        match delay {
            FRAME_LOOP => {
                stream.pos = 0;
                Ok(())
            }
            FRAME_HALT => {
                stream.state = State::Halted;
                Ok(())
            }
            _ => {
                let src_i = mem.read_u8(off + 2)? as usize;
                let dst_i = mem.read_u8(off + 3)? as usize;
                let src_x = mem.read_u16(off + 4)? as i32;
                let src_y = mem.read_u16(off + 6)? as i32;
                let w = mem.read_u16(off + 8)? as i32;
                let h = mem.read_u16(off + 10)? as i32;
                let dst_x = mem.read_u16(off + 12)? as i32 + stream.off_x as i32;
                let dst_y = mem.read_u16(off + 14)? as i32 + stream.off_y as i32;
                gfx.copy(src_x, src_y, w, h, src_i, dst_x, dst_y, dst_i)?;
                stream.pos += FRAME_SIZE;
                stream.wait = delay;
                Ok(())
            }
        }
    }

    // Drain pending ticks and advance running streams.
    pub fn execute(&mut self, mem: &Memory, gfx: &mut Gfx) -> Result<()> {
        // bound the catch-up work after a long statement
        let ticks = self.ticker.rx.try_iter().count().min(4);
        for _ in 0..ticks {
            for i in 0..ANIM_MAX_STREAMS {
                if self.streams[i].state != State::Running {
                    continue;
                }
                if self.streams[i].wait > 0 {
                    self.streams[i].wait -= 1;
                    continue;
                }
                let mut stream = self.streams[i];
                Self::exec_frame(&mut stream, mem, gfx)?;
                self.streams[i] = stream;
            }
        }
        Ok(())
    }
}
