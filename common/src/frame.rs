/// Bytes per pixel in a decoded frame (R, G, B).
pub const CHANNELS: usize = 3;

/// A decoded camera frame: 8-bit RGB, row-major, no padding between rows.
///
/// The pixel buffer always holds exactly `width * height * 3` bytes; the
/// constructor rejects anything else and the fields are not public, so a
/// `DecodedFrame` in hand is always fully populated.
///
/// Raw dump format (for handing frames to external viewers):
///   [0..4]   magic  b"RGB3"
///   [4..8]   width  (u32 big-endian)
///   [8..12]  height (u32 big-endian)
///   [12..]   pixels (width * height * 3 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

const DUMP_MAGIC: &[u8; 4] = b"RGB3";
const DUMP_HEADER_SIZE: usize = 12; // 4 magic + 4 width + 4 height

/// Number of bytes an RGB frame of the given size occupies, or `None` on overflow.
pub fn rgb_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(CHANNELS)
}

impl DecodedFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, FrameError> {
        let expected = rgb_len(width, height).ok_or(FrameError::Overflow { width, height })?;
        if pixels.len() != expected {
            return Err(FrameError::LengthMismatch {
                width,
                height,
                got: pixels.len(),
                expected,
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// The bytes of row `y`, or `None` past the last row.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.stride();
        Some(&self.pixels[start..start + self.stride()])
    }

    /// The `[r, g, b]` triplet at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width {
            return None;
        }
        let row = self.row(y)?;
        let i = x as usize * CHANNELS;
        Some([row[i], row[i + 1], row[i + 2]])
    }

    /// Index of the blue byte of the last pixel, i.e. where a full-frame
    /// backward sample walk starts. `None` for an empty frame.
    pub fn last_sample_offset(&self) -> Option<usize> {
        self.pixels.len().checked_sub(1)
    }

    pub fn same_dimensions(&self, other: &DecodedFrame) -> bool {
        self.width == other.width && self.height == other.height
    }

    // -- Raw dump format ---------------------------------------------------------

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DUMP_HEADER_SIZE + self.pixels.len());
        buf.extend_from_slice(DUMP_MAGIC);
        buf.extend_from_slice(&self.width.to_be_bytes());
        buf.extend_from_slice(&self.height.to_be_bytes());
        buf.extend_from_slice(&self.pixels);
        buf
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < DUMP_HEADER_SIZE {
            return Err(FrameError::TooShort {
                got: data.len(),
                expected: DUMP_HEADER_SIZE,
            });
        }
        let (header, pixels) = data.split_at(DUMP_HEADER_SIZE);
        if &header[0..4] != DUMP_MAGIC {
            return Err(FrameError::BadMagic);
        }
        let width = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        let height = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        Self::new(width, height, pixels.to_vec())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("pixel buffer for {width}x{height} frame has {got} bytes, expected {expected}")]
    LengthMismatch {
        width: u32,
        height: u32,
        got: usize,
        expected: usize,
    },
    #[error("frame size {width}x{height} overflows the address space")]
    Overflow { width: u32, height: u32 },
    #[error("frame dump too short: got {got} bytes, expected at least {expected}")]
    TooShort { got: usize, expected: usize },
    #[error("frame dump does not start with RGB3 magic")]
    BadMagic,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> DecodedFrame {
        let pixels = (0..rgb_len(width, height).unwrap())
            .map(|i| (i % 251) as u8)
            .collect();
        DecodedFrame::new(width, height, pixels).unwrap()
    }

    #[test]
    fn new_rejects_wrong_length() {
        let result = DecodedFrame::new(2, 2, vec![0; 11]);
        assert!(matches!(
            result,
            Err(FrameError::LengthMismatch { got: 11, expected: 12, .. })
        ));
    }

    #[test]
    fn empty_frame_is_representable() {
        let frame = DecodedFrame::new(0, 5, Vec::new()).unwrap();
        assert_eq!(frame.last_sample_offset(), None);
        assert!(frame.row(0).is_some_and(|r| r.is_empty()));
    }

    #[test]
    fn pixel_and_row_addressing() {
        let frame = gradient(3, 2);
        assert_eq!(frame.stride(), 9);
        assert_eq!(frame.row(1).unwrap(), &frame.pixels()[9..18]);
        assert_eq!(frame.pixel(2, 1), Some([15, 16, 17]));
        assert_eq!(frame.pixel(3, 0), None);
        assert_eq!(frame.pixel(0, 2), None);
        assert_eq!(frame.last_sample_offset(), Some(17));
    }

    #[test]
    fn dump_roundtrip() {
        let frame = gradient(4, 3);
        let bytes = frame.serialize();
        assert_eq!(&bytes[0..4], b"RGB3");
        assert_eq!(bytes.len(), 12 + 36);
        assert_eq!(DecodedFrame::deserialize(&bytes).unwrap(), frame);
    }

    #[test]
    fn dump_rejects_bad_input() {
        assert!(matches!(
            DecodedFrame::deserialize(&[0; 5]),
            Err(FrameError::TooShort { got: 5, .. })
        ));

        let mut bytes = gradient(1, 1).serialize();
        bytes[0] = b'X';
        assert!(matches!(
            DecodedFrame::deserialize(&bytes),
            Err(FrameError::BadMagic)
        ));

        let mut truncated = gradient(2, 2).serialize();
        truncated.pop();
        assert!(matches!(
            DecodedFrame::deserialize(&truncated),
            Err(FrameError::LengthMismatch { .. })
        ));
    }
}
