// Audio channels over rodio sinks. The VM posts play/stop/fade commands and
// carries on; fades are progressed from the cooperative update hook. A
// missing output device (headless runs, CI) downgrades everything to no-ops.

use log::warn;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::time::Instant;

const NR_AUX_CHANNELS: usize = 4;

struct Fade {
    from: f32,
    to: f32,
    start: Instant,
    duration_ms: u32,
    stop_when_done: bool,
}

#[derive(Default)]
struct Channel {
    sink: Option<Sink>,
    volume: f32,
    fade: Option<Fade>,
}

impl Channel {
    fn play(&mut self, handle: &OutputStreamHandle, data: Vec<u8>, looped: bool) {
        self.stop();
        let sink = match Sink::try_new(handle) {
            Ok(sink) => sink,
            Err(e) => {
                warn!("Failed to open audio sink: {}", e);
                return;
            }
        };
        let decoder = match Decoder::new(Cursor::new(data)) {
            Ok(d) => d,
            Err(e) => {
                warn!("Failed to decode audio: {}", e);
                return;
            }
        };
        if looped {
            use rodio::Source;
            sink.append(decoder.repeat_infinite());
        } else {
            sink.append(decoder);
        }
        sink.set_volume(self.volume);
        self.sink = Some(sink);
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.fade = None;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    fn fade(&mut self, to: f32, duration_ms: u32, stop_when_done: bool) {
        if self.sink.is_none() {
            return;
        }
        self.fade = Some(Fade {
            from: self.volume,
            to,
            start: Instant::now(),
            duration_ms: duration_ms.max(1),
            stop_when_done,
        });
    }

    fn update(&mut self) {
        let Some(fade) = &self.fade else { return };
        let elapsed = fade.start.elapsed().as_millis() as u32;
        if elapsed >= fade.duration_ms {
            let to = fade.to;
            let stop = fade.stop_when_done;
            self.fade = None;
            self.set_volume(to);
            if stop {
                self.stop();
            }
            return;
        }
        let t = elapsed as f32 / fade.duration_ms as f32;
        let v = fade.from + (fade.to - fade.from) * t;
        if let Some(sink) = &self.sink {
            sink.set_volume(v);
        }
    }
}

pub struct Audio {
    _stream: Option<OutputStream>,
    handle: Option<OutputStreamHandle>,
    bgm: Channel,
    voice: Channel,
    // numbered effect channels; SE and the aux slots share them
    aux: [Channel; NR_AUX_CHANNELS],
}

fn new_channel() -> Channel {
    Channel { sink: None, volume: 1.0, fade: None }
}

impl Audio {
    pub fn new(enabled: bool) -> Audio {
        let (stream, handle) = if enabled {
            match OutputStream::try_default() {
                Ok((stream, handle)) => (Some(stream), Some(handle)),
                Err(e) => {
                    warn!("Audio device unavailable: {}", e);
                    (None, None)
                }
            }
        } else {
            (None, None)
        };
        Audio {
            _stream: stream,
            handle,
            bgm: new_channel(),
            voice: new_channel(),
            aux: [new_channel(), new_channel(), new_channel(), new_channel()],
        }
    }

    pub fn bgm_play(&mut self, data: Vec<u8>, looped: bool) {
        if let Some(handle) = &self.handle {
            self.bgm.play(handle, data, looped);
        }
    }

    pub fn bgm_stop(&mut self) {
        self.bgm.stop();
    }

    // volume is the bytecode's 0..=127 scale
    pub fn bgm_set_volume(&mut self, volume: u32) {
        self.bgm.set_volume((volume.min(127) as f32) / 127.0);
    }

    pub fn bgm_fade(&mut self, volume: u32, time_ms: u32, stop: bool) {
        self.bgm.fade((volume.min(127) as f32) / 127.0, time_ms, stop);
    }

    pub fn se_play(&mut self, ch: usize, data: Vec<u8>) {
        self.aux_play(ch, data, false);
    }

    pub fn se_stop(&mut self, ch: usize) {
        self.aux_stop(ch);
    }

    pub fn voice_play(&mut self, data: Vec<u8>) {
        if let Some(handle) = &self.handle {
            self.voice.play(handle, data, false);
        }
    }

    pub fn voice_stop(&mut self) {
        self.voice.stop();
    }

    pub fn aux_play(&mut self, ch: usize, data: Vec<u8>, looped: bool) {
        if ch >= NR_AUX_CHANNELS {
            warn!("Invalid aux audio channel: {}", ch);
            return;
        }
        if let Some(handle) = &self.handle {
            self.aux[ch].play(handle, data, looped);
        }
    }

    pub fn aux_stop(&mut self, ch: usize) {
        if ch >= NR_AUX_CHANNELS {
            warn!("Invalid aux audio channel: {}", ch);
            return;
        }
        self.aux[ch].stop();
    }

    pub fn update(&mut self) {
        self.bgm.update();
        self.voice.update();
        for ch in self.aux.iter_mut() {
            ch.update();
        }
    }
}
