//! Pixel buffers exchanged between boards.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BoardError, Result};

/// A copy of a board's pixels: straight (non-premultiplied) RGBA, row-major.
///
/// `data.len() == width * height * 4` always holds.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(try_from = "RawImageData")]
pub struct ImageData {
    width: u32,
    height: u32,
    #[serde(serialize_with = "serialize_base64")]
    data: Vec<u8>,
}

impl ImageData {
    /// A fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = buffer_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    pub fn from_data(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = buffer_len(width, height)?;
        if data.len() != expected {
            return Err(BoardError::InvalidDataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    // Pixmaps are never empty and always match their dimensions.
    pub(crate) fn from_pixmap_data(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGBA at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.data[idx..idx + 4].try_into().ok()
    }

    /// Number of pixels with non-zero alpha.
    pub fn inked_pixels(&self) -> usize {
        self.data.chunks_exact(4).filter(|px| px[3] != 0).count()
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn buffer_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .filter(|&n| n > 0)
        .ok_or(BoardError::InvalidDimensions { width, height })
}

fn serialize_base64<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(bytes))
}

fn deserialize_base64<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

// Wire shape before the length check.
#[derive(Deserialize)]
struct RawImageData {
    width: u32,
    height: u32,
    #[serde(deserialize_with = "deserialize_base64")]
    data: Vec<u8>,
}

impl TryFrom<RawImageData> for ImageData {
    type Error = BoardError;

    fn try_from(raw: RawImageData) -> Result<Self> {
        ImageData::from_data(raw.data, raw.width, raw.height)
    }
}
