//! Image size, MIME type and audio container conversions.

use std::fmt;

/// Imagen resolution bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSizeBucket {
    OneK,
    TwoK,
}

impl ImageSizeBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSizeBucket::OneK => "1k",
            ImageSizeBucket::TwoK => "2k",
        }
    }

    /// Case-insensitive parse; unknown tokens yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1k" => Some(ImageSizeBucket::OneK),
            "2k" => Some(ImageSizeBucket::TwoK),
            _ => None,
        }
    }

    fn base_pixels(self) -> u32 {
        match self {
            ImageSizeBucket::OneK => 1024,
            ImageSizeBucket::TwoK => 2048,
        }
    }
}

/// Aspect ratios Imagen accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    Portrait3x4,
    Landscape4x3,
    Portrait9x16,
    Landscape16x9,
}

/// `(ratio, token, width/height lower bound, upper bound)`.
const ASPECT_RATIO_BANDS: [(AspectRatio, &str, f64, f64); 5] = [
    (AspectRatio::Square, "1:1", 0.99, 1.01),
    (AspectRatio::Portrait3x4, "3:4", 0.74, 0.76),
    (AspectRatio::Landscape4x3, "4:3", 1.32, 1.34),
    (AspectRatio::Portrait9x16, "9:16", 0.56, 0.57),
    (AspectRatio::Landscape16x9, "16:9", 1.77, 1.78),
];

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        ASPECT_RATIO_BANDS
            .iter()
            .find(|(ratio, ..)| *ratio == self)
            .map(|(_, token, ..)| *token)
            .unwrap_or("1:1")
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        ASPECT_RATIO_BANDS
            .iter()
            .find(|(_, token, ..)| *token == raw)
            .map(|(ratio, ..)| *ratio)
    }

    fn from_quotient(quotient: f64) -> Option<Self> {
        ASPECT_RATIO_BANDS
            .iter()
            .find(|(_, _, low, high)| (*low..=*high).contains(&quotient))
            .map(|(ratio, ..)| *ratio)
    }

    /// `(width, height)` for a square side of `base`, truncating.
    fn dimensions(self, base: u32) -> (u32, u32) {
        match self {
            AspectRatio::Square => (base, base),
            AspectRatio::Portrait3x4 => (base * 3 / 4, base),
            AspectRatio::Landscape4x3 => (base, base * 3 / 4),
            AspectRatio::Portrait9x16 => (base * 9 / 16, base),
            AspectRatio::Landscape16x9 => (base, base * 9 / 16),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Imagen-style size: a resolution bucket and an aspect ratio, each optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImagenSize {
    pub image_size: Option<ImageSizeBucket>,
    pub aspect_ratio: Option<AspectRatio>,
}

impl ImagenSize {
    pub fn is_empty(&self) -> bool {
        self.image_size.is_none() && self.aspect_ratio.is_none()
    }
}

/// Converts `WIDTHxHEIGHT` into a bucket and aspect ratio.
///
/// Returns an empty [`ImagenSize`] when `size` is not two positive integers.
/// The ratio is matched against fixed tolerance bands and left unset outside
/// them.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::media::{size_to_imagen_format, AspectRatio, ImageSizeBucket};
///
/// let size = size_to_imagen_format("1820x1024");
/// assert_eq!(size.image_size, Some(ImageSizeBucket::TwoK));
/// assert_eq!(size.aspect_ratio, Some(AspectRatio::Landscape16x9));
/// assert!(size_to_imagen_format("auto").is_empty());
/// ```
pub fn size_to_imagen_format(size: &str) -> ImagenSize {
    let mut parts = size.trim().split('x');
    let (Some(width), Some(height), None) = (parts.next(), parts.next(), parts.next()) else {
        return ImagenSize::default();
    };
    let (Ok(width), Ok(height)) = (width.trim().parse::<u32>(), height.trim().parse::<u32>()) else {
        return ImagenSize::default();
    };
    if width == 0 || height == 0 {
        return ImagenSize::default();
    }

    let image_size = if width <= 1024 && height <= 1024 {
        Some(ImageSizeBucket::OneK)
    } else if width <= 2048 && height <= 2048 {
        Some(ImageSizeBucket::TwoK)
    } else {
        None
    };

    ImagenSize {
        image_size,
        aspect_ratio: AspectRatio::from_quotient(f64::from(width) / f64::from(height)),
    }
}

/// Best-effort inverse of [`size_to_imagen_format`].
///
/// Not an exact round trip: integer truncation and the tolerance bands lose
/// information.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::media::imagen_format_to_size;
///
/// assert_eq!(imagen_format_to_size(Some("2K"), Some("16:9")), "2048x1152");
/// assert_eq!(imagen_format_to_size(None, Some("3:4")), "768x1024");
/// assert_eq!(imagen_format_to_size(Some("8k"), Some("21:9")), "1024x1024");
/// ```
pub fn imagen_format_to_size(image_size: Option<&str>, aspect_ratio: Option<&str>) -> String {
    let base = image_size
        .and_then(ImageSizeBucket::parse)
        .unwrap_or(ImageSizeBucket::OneK)
        .base_pixels();
    let (width, height) = aspect_ratio
        .and_then(AspectRatio::parse)
        .unwrap_or(AspectRatio::Square)
        .dimensions(base);
    format!("{width}x{height}")
}

/// MIME type without parameters, lowercased.
fn bare_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `(mime type, extension)`; the first row for an extension is the canonical MIME.
const IMAGE_MIME_TABLE: [(&str, &str); 5] = [
    ("image/png", "png"),
    ("image/jpeg", "jpeg"),
    ("image/jpg", "jpeg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Maps an image MIME type to a file-extension token.
///
/// Unknown types fall back to the subtype after `/`, or an empty string.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::media::mime_type_to_extension;
///
/// assert_eq!(mime_type_to_extension("image/jpeg; q=0.9"), "jpeg");
/// assert_eq!(mime_type_to_extension("IMAGE/PNG"), "png");
/// assert_eq!(mime_type_to_extension("image/heic"), "heic");
/// assert_eq!(mime_type_to_extension("binary"), "");
/// ```
pub fn mime_type_to_extension(mime: &str) -> String {
    let mime = bare_mime(mime);
    if let Some((_, extension)) = IMAGE_MIME_TABLE.iter().find(|(known, _)| *known == mime) {
        return (*extension).to_string();
    }
    mime.split_once('/')
        .map(|(_, subtype)| subtype.to_string())
        .unwrap_or_default()
}

/// Maps a requested output format token to a MIME type Gemini can produce.
///
/// Returns `None` for formats without an encoder; callers fall back to PNG.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::media::output_format_to_mime_type;
///
/// assert_eq!(output_format_to_mime_type("JPG"), Some("image/jpeg"));
/// assert_eq!(output_format_to_mime_type("bmp"), None);
/// ```
pub fn output_format_to_mime_type(format: &str) -> Option<&'static str> {
    match format.trim().to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// MIME type used when image bytes match no known container.
pub const FALLBACK_IMAGE_MIME: &str = "image/png";

/// Sniffs an image MIME type from magic bytes, falling back to PNG.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::media::detect_image_mime_type;
///
/// assert_eq!(detect_image_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
/// assert_eq!(detect_image_mime_type(b"????"), "image/png");
/// ```
pub fn detect_image_mime_type(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_IMAGE_MIME)
}

/// Default MIME type of sniffed audio when no container is recognized.
pub const FALLBACK_AUDIO_MIME: &str = "audio/mp3";

/// Sniffs an audio MIME type from magic bytes.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::media::detect_audio_mime_type;
///
/// let mut wav = b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec();
/// wav.extend_from_slice(&[0u8; 32]);
/// assert_eq!(detect_audio_mime_type(&wav), "audio/wav");
/// assert_eq!(detect_audio_mime_type(b"unknown"), "audio/mp3");
/// ```
pub fn detect_audio_mime_type(bytes: &[u8]) -> &'static str {
    // infer 不识别 ADIF 头的 AAC 与 AIFC
    if bytes.starts_with(b"ADIF") {
        return "audio/aac";
    }
    if bytes.len() >= 12 && bytes.starts_with(b"FORM") && &bytes[8..12] == b"AIFC" {
        return "audio/aiff";
    }
    let Some(kind) = infer::get(bytes) else {
        return FALLBACK_AUDIO_MIME;
    };
    match kind.extension() {
        "wav" => "audio/wav",
        "mp3" => "audio/mp3",
        "aac" => "audio/aac",
        "aif" | "aiff" => "audio/aiff",
        "flac" => "audio/flac",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "m4a" => "audio/mp4",
        _ => FALLBACK_AUDIO_MIME,
    }
}

/// Returns `true` when `bytes` starts with a RIFF/WAVE header.
pub fn is_wav_container(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Raw PCM layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// Gemini TTS output: signed 16-bit little-endian, 24 kHz, mono.
pub const GEMINI_TTS_PCM: PcmFormat = PcmFormat {
    sample_rate: 24_000,
    channels: 1,
    bits_per_sample: 16,
};

/// MIME type Gemini uses for inline TTS audio.
pub const GEMINI_TTS_PCM_MIME: &str = "audio/L16;codec=pcm;rate=24000";

/// Wraps raw PCM samples in a canonical 44-byte WAV header.
pub fn pcm_to_wav(pcm: &[u8], format: PcmFormat) -> Vec<u8> {
    let block_align = format.channels * format.bits_per_sample / 8;
    let byte_rate = format.sample_rate * u32::from(block_align);
    let data_len = u32::try_from(pcm.len()).unwrap_or(u32::MAX);

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&data_len.saturating_add(36).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&format.channels.to_le_bytes());
    wav.extend_from_slice(&format.sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&format.bits_per_sample.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

/// Returns the `data` chunk of a WAV container, or `None` if it has none.
pub fn wav_to_pcm(bytes: &[u8]) -> Option<&[u8]> {
    if !is_wav_container(bytes) {
        return None;
    }
    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]) as usize;
        let start = offset + 8;
        if id == b"data" {
            let end = start.saturating_add(size).min(bytes.len());
            return Some(&bytes[start..end]);
        }
        // chunk 按偶数字节对齐
        offset = start.saturating_add(size).saturating_add(size % 2);
    }
    None
}
