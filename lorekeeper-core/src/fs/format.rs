/// §4.7 format detection by magic bytes over the first 12 bytes of the
/// stream. Reuses the already-present `infer` crate (a teacher dependency
/// that, before this crate, only inspected audio containers) and cross-
/// checks against the literal byte patterns the spec calls out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
        }
    }
}

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub fn detect(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.len() >= JPEG_MAGIC.len() && bytes[..JPEG_MAGIC.len()] == JPEG_MAGIC {
        return Some(ImageFormat::Jpeg);
    }
    if bytes.len() >= PNG_MAGIC.len() && bytes[..PNG_MAGIC.len()] == PNG_MAGIC {
        return Some(ImageFormat::Png);
    }
    if is_webp(bytes) {
        return Some(ImageFormat::WebP);
    }
    // Fall back to infer's broader sniffing table for anything the literal
    // magic-byte checks above miss.
    match infer::get(bytes).map(|k| k.mime_type()) {
        Some("image/jpeg") => Some(ImageFormat::Jpeg),
        Some("image/png") => Some(ImageFormat::Png),
        Some("image/webp") => Some(ImageFormat::WebP),
        _ => None,
    }
}

/// `RIFF????WEBP`: 4-byte `RIFF`, 4 arbitrary size bytes, then `WEBP`.
fn is_webp(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}
