//! SDL_mixer: audio device, file streams and sample chunks.

use std::{ffi::CString, fmt, path::Path};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    backend::Backend,
    guard::{acquire, relinquish, CoreGuard, Subsystem},
    handle::{HandleKind, Owned},
    video::path_to_cstring,
    Result, SdlError,
};

bitflags! {
    /// Decoder libraries loaded by `Mix_Init`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MixerFlags: u32 {
        const FLAC = 0x0000_0001;
        const MOD = 0x0000_0002;
        const MP3 = 0x0000_0008;
        const OGG = 0x0000_0010;
        const MID = 0x0000_0020;
        const OPUS = 0x0000_0040;
    }
}

/// Native sample format (`AUDIO_*` constants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioFormat(pub u16);

impl AudioFormat {
    pub const U8: AudioFormat = AudioFormat(0x0008);
    pub const S8: AudioFormat = AudioFormat(0x8008);
    pub const S16LSB: AudioFormat = AudioFormat(0x8010);
    pub const S16MSB: AudioFormat = AudioFormat(0x9010);
    pub const F32LSB: AudioFormat = AudioFormat(0x8120);

    /// Signed 16-bit samples in the host byte order (`MIX_DEFAULT_FORMAT`).
    #[cfg(target_endian = "little")]
    pub const DEFAULT: AudioFormat = Self::S16LSB;
    #[cfg(target_endian = "big")]
    pub const DEFAULT: AudioFormat = Self::S16MSB;
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Parameters for `Mix_OpenAudio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSpec {
    pub frequency: u32,
    pub format: AudioFormat,
    pub channels: u32,
    pub chunk_size: u32,
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self {
            frequency: 48_000,
            format: AudioFormat::DEFAULT,
            channels: 8,
            chunk_size: 2048,
        }
    }
}

/// Keeps SDL_mixer's decoder libraries loaded (`Mix_Init` / `Mix_Quit`).
pub struct MixerGuard<'c, B: Backend> {
    backend: &'c B,
    flags: MixerFlags,
}

impl<'c, B: Backend> MixerGuard<'c, B> {
    /// Loads the decoders in `flags`. Empty flags load nothing and always
    /// succeed, which still arms the `Mix_Quit` on drop.
    pub fn init(core: &'c CoreGuard<'_, B>, flags: MixerFlags) -> Result<Self> {
        let backend = core.backend();
        acquire(backend, Subsystem::Mixer, || {
            let loaded = backend.mix_init(flags);
            if !loaded.contains(flags) {
                let message = backend.last_error();
                backend.mix_quit();
                return Err(SdlError::native("Mix_Init", message));
            }
            Ok(())
        })?;

        Ok(Self { backend, flags })
    }

    pub fn flags(&self) -> MixerFlags {
        self.flags
    }

    pub fn backend(&self) -> &'c B {
        self.backend
    }
}

impl<B: Backend> Drop for MixerGuard<'_, B> {
    fn drop(&mut self) {
        relinquish(self.backend, Subsystem::Mixer, || self.backend.mix_quit());
    }
}

impl<B: Backend> fmt::Debug for MixerGuard<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixerGuard")
            .field("flags", &self.flags)
            .finish()
    }
}

/// The opened audio output (`Mix_OpenAudio` / `Mix_CloseAudio`).
pub struct AudioDevice<'m, B: Backend> {
    backend: &'m B,
    spec: AudioSpec,
}

impl<'m, B: Backend> AudioDevice<'m, B> {
    pub fn open(mixer: &'m MixerGuard<'_, B>, spec: AudioSpec) -> Result<Self> {
        let backend = mixer.backend();
        for (what, value) in [
            ("frequency", spec.frequency),
            ("channels", spec.channels),
            ("chunk size", spec.chunk_size),
        ] {
            if i32::try_from(value).is_err() {
                return Err(SdlError::InvalidArgument(format!(
                    "audio {what} {value} is out of range"
                )));
            }
        }

        acquire(backend, Subsystem::AudioDevice, || {
            if backend.open_audio(&spec) < 0 {
                let message = backend.last_error();
                return Err(SdlError::native("Mix_OpenAudio", message));
            }
            Ok(())
        })?;

        debug!(?spec, "audio device opened");
        Ok(Self { backend, spec })
    }

    pub fn spec(&self) -> &AudioSpec {
        &self.spec
    }

    pub fn backend(&self) -> &'m B {
        self.backend
    }
}

impl<B: Backend> Drop for AudioDevice<'_, B> {
    fn drop(&mut self) {
        relinquish(self.backend, Subsystem::AudioDevice, || {
            self.backend.close_audio()
        });
    }
}

impl<B: Backend> fmt::Debug for AudioDevice<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioDevice")
            .field("spec", &self.spec)
            .finish()
    }
}

/// Marker for native file streams (`SDL_RWops`).
pub enum StreamKind {}

impl<B: Backend> HandleKind<B> for StreamKind {
    type Raw = B::Stream;
    const NAME: &'static str = "stream";

    fn release(backend: &B, raw: Self::Raw) {
        backend.rw_close(raw);
    }
}

/// Marker for decoded sample chunks.
pub enum ChunkKind {}

impl<B: Backend> HandleKind<B> for ChunkKind {
    type Raw = B::Chunk;
    const NAME: &'static str = "audio chunk";

    fn release(backend: &B, raw: Self::Raw) {
        backend.free_chunk(raw);
    }
}

pub type RwStream<'a, B> = Owned<'a, B, StreamKind>;
pub type AudioChunk<'a, B> = Owned<'a, B, ChunkKind>;

impl<'a, B: Backend> Owned<'a, B, StreamKind> {
    /// Opens `path` with an `fopen`-style `mode` such as `"rb"`.
    pub fn from_file(core: &'a CoreGuard<'_, B>, path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let backend = core.backend();
        let path = path_to_cstring(path.as_ref())?;
        let mode = CString::new(mode)?;
        let raw = backend.rw_from_file(&path, &mode);
        Self::create(backend, "SDL_RWFromFile", raw)
    }
}

impl<'a, B: Backend> Owned<'a, B, ChunkKind> {
    /// Decodes a whole stream into memory. The stream is consumed and closed
    /// by the native call whether decoding succeeds or not.
    pub fn load(device: &'a AudioDevice<'_, B>, stream: RwStream<'_, B>) -> Result<Self> {
        let backend = device.backend();
        let source = stream.into_raw().ok_or(SdlError::EmptyHandle("stream"))?;

        let raw = backend.load_wav_rw(source, true);
        Self::create(backend, "Mix_LoadWAV_RW", raw)
    }

    /// Opens `path` read-only and decodes it.
    pub fn from_file(device: &'a AudioDevice<'_, B>, path: impl AsRef<Path>) -> Result<Self> {
        let backend = device.backend();
        let path = path_to_cstring(path.as_ref())?;
        let mode = CString::new("rb")?;
        let stream = RwStream::create(backend, "SDL_RWFromFile", backend.rw_from_file(&path, &mode))?;
        Self::load(device, stream)
    }

    /// Starts playback on `channel` (`None` for the first free one), repeating
    /// `loops` extra times; `-1` loops forever. Returns the channel used.
    pub fn play(&self, channel: Option<u32>, loops: i32) -> Result<u32> {
        let channel = match channel {
            Some(channel) => i32::try_from(channel).map_err(|_| {
                SdlError::InvalidArgument(format!("channel {channel} is out of range"))
            })?,
            None => -1,
        };

        let played = self.backend().play_channel(channel, self.require()?, loops);
        if played < 0 {
            let message = self.backend().last_error();
            return Err(SdlError::native("Mix_PlayChannel", message));
        }
        Ok(played as u32)
    }
}
