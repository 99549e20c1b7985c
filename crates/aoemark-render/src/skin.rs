//! Decorative skins drawn inside measurement shapes.

use aoemark_core::SharedMeasurement;
use image::AnimationDecoder;
use image::codecs::gif::GifDecoder;
use kurbo::Size;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

/// Skin errors.
#[derive(Debug, Error)]
pub enum SkinError {
    #[error("Failed to decode skin: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Pixel buffer of {len} bytes does not match {width}x{height} RGBA")]
    BufferSize { width: u32, height: u32, len: usize },
    #[error("Animation has no frames")]
    NoFrames,
}

/// Decoded RGBA8 image. Cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinImage {
    width: u32,
    height: u32,
    rgba: Arc<Vec<u8>>,
}

impl SkinImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, SkinError> {
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(SkinError::BufferSize {
                width,
                height,
                len: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba: Arc::new(rgba),
        })
    }

    /// Decode PNG, JPEG or WebP bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, SkinError> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

/// A source of animation frames.
pub trait FrameSource: Send + Sync {
    /// Frame to show at `now_ms`, or `None` while nothing is buffered.
    fn frame_at(&self, now_ms: u64) -> Option<&SkinImage>;

    /// Number of frames decoded so far.
    fn buffered(&self) -> usize;
}

/// Fixed sequence of frames with per-frame delays, looping.
#[derive(Debug, Clone, Default)]
pub struct FrameSequence {
    frames: Vec<(SkinImage, u64)>,
    total_ms: u64,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame shown for `delay_ms` (at least 1 ms).
    pub fn push(&mut self, frame: SkinImage, delay_ms: u64) {
        let delay_ms = delay_ms.max(1);
        self.total_ms += delay_ms;
        self.frames.push((frame, delay_ms));
    }

    /// Decode every frame of an animated GIF.
    pub fn decode_gif(bytes: &[u8]) -> Result<Self, SkinError> {
        let decoder = GifDecoder::new(Cursor::new(bytes))?;
        let frames = decoder.into_frames().collect_frames()?;
        if frames.is_empty() {
            return Err(SkinError::NoFrames);
        }
        let mut sequence = Self::new();
        for frame in frames {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay_ms = if denom == 0 { 0 } else { u64::from(numer / denom) };
            let buffer = frame.into_buffer();
            let (width, height) = buffer.dimensions();
            sequence.push(SkinImage::new(width, height, buffer.into_raw())?, delay_ms);
        }
        log::debug!("Decoded animated skin: {} frames, {} ms loop", sequence.frames.len(), sequence.total_ms);
        Ok(sequence)
    }
}

impl FrameSource for FrameSequence {
    fn frame_at(&self, now_ms: u64) -> Option<&SkinImage> {
        if self.total_ms == 0 {
            return None;
        }
        let mut t = now_ms % self.total_ms;
        for (frame, delay) in &self.frames {
            if t < *delay {
                return Some(frame);
            }
            t -= delay;
        }
        self.frames.last().map(|(frame, _)| frame)
    }

    fn buffered(&self) -> usize {
        self.frames.len()
    }
}

/// A skin, still or animated.
pub enum Skin {
    Still(SkinImage),
    Animated(Box<dyn FrameSource>),
}

impl Skin {
    /// Still images are always ready; animations once a frame is buffered.
    pub fn is_ready(&self) -> bool {
        match self {
            Skin::Still(_) => true,
            Skin::Animated(source) => source.buffered() > 0,
        }
    }

    /// Image to draw at `now_ms`.
    pub fn frame(&self, now_ms: u64) -> Option<&SkinImage> {
        match self {
            Skin::Still(image) => Some(image),
            Skin::Animated(source) => source.frame_at(now_ms),
        }
    }
}

impl std::fmt::Debug for Skin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skin::Still(image) => f.debug_tuple("Still").field(&image.size()).finish(),
            Skin::Animated(source) => f.debug_struct("Animated").field("buffered", &source.buffered()).finish(),
        }
    }
}

/// Decoded skins by name.
#[derive(Debug, Default)]
pub struct SkinLibrary {
    skins: HashMap<String, Skin>,
}

impl SkinLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and register a still image.
    pub fn load_still(&mut self, name: &str, bytes: &[u8]) -> Result<(), SkinError> {
        let image = SkinImage::decode(bytes)?;
        log::info!("Loaded skin {} ({}x{})", name, image.width(), image.height());
        self.insert(name, Skin::Still(image));
        Ok(())
    }

    /// Decode and register an animated GIF.
    pub fn load_animated(&mut self, name: &str, bytes: &[u8]) -> Result<(), SkinError> {
        let sequence = FrameSequence::decode_gif(bytes)?;
        self.insert(name, Skin::Animated(Box::new(sequence)));
        Ok(())
    }

    pub fn insert(&mut self, name: &str, skin: Skin) {
        self.skins.insert(name.to_string(), skin);
    }

    pub fn get(&self, name: &str) -> Option<&Skin> {
        self.skins.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Skin> {
        self.skins.remove(name)
    }

    pub fn len(&self) -> usize {
        self.skins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skins.is_empty()
    }

    /// Skin referenced by a measurement, if registered.
    pub fn resolve(&self, measurement: &SharedMeasurement) -> Option<&Skin> {
        let name = measurement.skin.as_deref()?;
        let skin = self.get(name);
        if skin.is_none() {
            log::debug!("Skin {} not loaded", name);
        }
        skin
    }
}
