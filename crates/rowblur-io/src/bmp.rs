//! 24-bit bitmap framing.
//!
//! # Format Details
//!
//! ```text
//! offset  size  field
//! ------  ----  -------------------------------
//!      0     2  magic tag ("BM")
//!      2     4  total file size
//!      6     4  reserved
//!     10     4  pixel data offset
//!     14    40  frame header (see FrameHeader)
//!     54     *  rows, bottom row first, B G R per pixel, no row padding
//! ```
//!
//! Every multi-byte field is little-endian and is decoded field by field, so
//! nothing depends on in-memory struct layout. Headers are kept verbatim and
//! written back unchanged, which makes a decode/encode cycle byte-exact for
//! files that follow this layout.
//!
//! Malformed headers are not validated: the pixel rows are read right after
//! the frame header using the declared width and height.

use crate::{IoError, IoResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rowblur_core::{PixelStore, Rgb};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

/// Magic tag of the file header.
pub const MAGIC: [u8; 2] = *b"BM";
/// Encoded size of [`FileHeader`].
pub const FILE_HEADER_SIZE: u32 = 14;
/// Encoded size of [`FrameHeader`].
pub const FRAME_HEADER_SIZE: u32 = 40;
/// Offset of the first pixel row when both headers are present.
pub const PIXEL_OFFSET: u32 = FILE_HEADER_SIZE + FRAME_HEADER_SIZE;
/// Bytes per pixel on disk.
pub const BYTES_PER_PIXEL: usize = 3;

// === Headers ===

/// File header: tag plus size fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Format tag, `BM` for bitmaps.
    pub magic: [u8; 2],
    /// Total file size in bytes.
    pub file_size: u32,
    /// Reserved, carried through untouched.
    pub reserved: i32,
    /// Offset of the pixel rows from the start of the file.
    pub pixel_offset: u32,
}

impl FileHeader {
    /// Header for a freshly encoded image of `pixel_bytes` bytes.
    pub fn for_pixel_bytes(pixel_bytes: u32) -> Self {
        Self {
            magic: MAGIC,
            file_size: PIXEL_OFFSET + pixel_bytes,
            reserved: 0,
            pixel_offset: PIXEL_OFFSET,
        }
    }

    /// Decodes the header from its 14 on-disk bytes.
    pub fn read_from<R: Read>(reader: &mut R) -> IoResult<Self> {
        let mut magic = [0u8; 2];
        reader
            .read_exact(&mut magic)
            .map_err(|e| IoError::DecodeError(format!("failed to read magic: {}", e)))?;
        let file_size = read_u32(reader)?;
        let reserved = reader
            .read_i32::<LittleEndian>()
            .map_err(|e| IoError::DecodeError(e.to_string()))?;
        let pixel_offset = read_u32(reader)?;
        Ok(Self {
            magic,
            file_size,
            reserved,
            pixel_offset,
        })
    }

    /// Encodes the header as 14 bytes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        writer.write_all(&self.magic)?;
        writer.write_u32::<LittleEndian>(self.file_size)?;
        writer.write_i32::<LittleEndian>(self.reserved)?;
        writer.write_u32::<LittleEndian>(self.pixel_offset)?;
        Ok(())
    }
}

/// Frame header: dimensions and pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Size of this header, 40 for the layout handled here.
    pub header_size: u32,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Color plane count, always 1 in practice.
    pub color_planes: u16,
    /// Bits per pixel, 24 for the layout handled here.
    pub bits_per_pixel: u16,
    /// Compression mode, 0 for uncompressed.
    pub compression: u32,
    /// Declared size of the pixel data.
    pub image_size: u32,
    /// Resolution and palette words, carried through untouched.
    pub reserved: [u32; 4],
}

impl FrameHeader {
    /// Header for a freshly encoded `width` x `height` image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            header_size: FRAME_HEADER_SIZE,
            width,
            height,
            color_planes: 1,
            bits_per_pixel: 24,
            compression: 0,
            image_size: width * height * BYTES_PER_PIXEL as u32,
            reserved: [0; 4],
        }
    }

    /// Length of one color plane, `width * height`.
    #[inline]
    pub fn plane_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Decodes the header from its 40 on-disk bytes.
    pub fn read_from<R: Read>(reader: &mut R) -> IoResult<Self> {
        let header_size = read_u32(reader)?;
        let width = read_u32(reader)?;
        let height = read_u32(reader)?;
        let color_planes = read_u16(reader)?;
        let bits_per_pixel = read_u16(reader)?;
        let compression = read_u32(reader)?;
        let image_size = read_u32(reader)?;
        let mut reserved = [0u32; 4];
        for word in &mut reserved {
            *word = read_u32(reader)?;
        }
        Ok(Self {
            header_size,
            width,
            height,
            color_planes,
            bits_per_pixel,
            compression,
            image_size,
            reserved,
        })
    }

    /// Encodes the header as 40 bytes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        writer.write_u32::<LittleEndian>(self.header_size)?;
        writer.write_u32::<LittleEndian>(self.width)?;
        writer.write_u32::<LittleEndian>(self.height)?;
        writer.write_u16::<LittleEndian>(self.color_planes)?;
        writer.write_u16::<LittleEndian>(self.bits_per_pixel)?;
        writer.write_u32::<LittleEndian>(self.compression)?;
        writer.write_u32::<LittleEndian>(self.image_size)?;
        for &word in &self.reserved {
            writer.write_u32::<LittleEndian>(word)?;
        }
        Ok(())
    }
}

// === Bitmap ===

/// A decoded bitmap: both headers plus the pixel store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// File header as read (or generated).
    pub file_header: FileHeader,
    /// Frame header as read (or generated).
    pub frame_header: FrameHeader,
    /// Pixels, top row first.
    pub pixels: PixelStore,
}

impl Bitmap {
    /// Wraps a pixel store with freshly generated headers.
    pub fn from_store(pixels: PixelStore) -> Self {
        let frame_header = FrameHeader::new(pixels.width(), pixels.height());
        let file_header = FileHeader::for_pixel_bytes(frame_header.image_size);
        Self {
            file_header,
            frame_header,
            pixels,
        }
    }

    /// Keeps this bitmap's headers around a different pixel store.
    ///
    /// Used to write the filtered image with the input's headers.
    pub fn with_pixels(&self, pixels: PixelStore) -> Self {
        Self {
            file_header: self.file_header,
            frame_header: self.frame_header,
            pixels,
        }
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Decodes a bitmap from any reader.
    pub fn read_from<R: Read>(reader: &mut R) -> IoResult<Self> {
        let file_header = FileHeader::read_from(reader)?;
        let frame_header = FrameHeader::read_from(reader)?;
        let (width, height) = (frame_header.width, frame_header.height);
        trace!(width, height, bpp = frame_header.bits_per_pixel, "Bitmap::read_from");

        if file_header.magic != MAGIC {
            warn!(magic = ?file_header.magic, "unexpected bitmap magic tag");
        }
        if frame_header.bits_per_pixel != 24 {
            warn!(bpp = frame_header.bits_per_pixel, "bitmap is not 24 bpp, reading as 24 bpp anyway");
        }
        if file_header.pixel_offset != PIXEL_OFFSET {
            debug!(
                offset = file_header.pixel_offset,
                "ignoring pixel offset, rows follow the frame header"
            );
        }

        let row_len = width as usize * BYTES_PER_PIXEL;
        let mut row_buf = vec![0u8; row_len];
        let mut rows: Vec<Vec<Rgb>> = Vec::with_capacity(height as usize);
        for _ in 0..height {
            reader
                .read_exact(&mut row_buf)
                .map_err(|e| IoError::DecodeError(format!("truncated pixel data: {}", e)))?;
            rows.push(
                row_buf
                    .chunks_exact(BYTES_PER_PIXEL)
                    .map(|bgr| Rgb::new(bgr[2], bgr[1], bgr[0]))
                    .collect(),
            );
        }
        // Disk order is bottom-to-top.
        rows.reverse();

        let pixels = PixelStore::from_pixels(width, height, rows.concat())?;
        debug!(width, height, "decoded bitmap");
        Ok(Self {
            file_header,
            frame_header,
            pixels,
        })
    }

    /// Encodes the bitmap to any writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        trace!(width = self.width(), height = self.height(), "Bitmap::write_to");
        if (self.frame_header.width, self.frame_header.height) != self.pixels.dimensions() {
            return Err(IoError::EncodeError(format!(
                "frame header says {}x{}, pixel store is {}x{}",
                self.frame_header.width,
                self.frame_header.height,
                self.width(),
                self.height()
            )));
        }

        self.file_header.write_to(writer)?;
        self.frame_header.write_to(writer)?;

        let mut row_buf = Vec::with_capacity(self.width() as usize * BYTES_PER_PIXEL);
        for y in (0..self.height()).rev() {
            row_buf.clear();
            for px in self.pixels.row(y) {
                row_buf.extend_from_slice(&[px.b, px.g, px.r]);
            }
            writer.write_all(&row_buf)?;
        }
        Ok(())
    }

    /// Decodes a bitmap held in memory.
    pub fn read_from_memory(data: &[u8]) -> IoResult<Self> {
        Self::read_from(&mut Cursor::new(data))
    }

    /// Encodes the bitmap into a byte vector.
    pub fn write_to_memory(&self) -> IoResult<Vec<u8>> {
        let pixel_bytes = self.pixels.pixel_count() * BYTES_PER_PIXEL;
        let mut out = Vec::with_capacity(PIXEL_OFFSET as usize + pixel_bytes);
        self.write_to(&mut out)?;
        Ok(out)
    }
}

/// Reads a bitmap from a file.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<Bitmap> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);
    Bitmap::read_from(&mut reader)
}

/// Writes a bitmap to a file, creating or truncating it.
pub fn write<P: AsRef<Path>>(path: P, bitmap: &Bitmap) -> IoResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    bitmap.write_to(&mut writer)?;
    writer.flush()?;
    Ok(())
}

// === Internal Read Functions ===

fn read_u16<R: Read>(reader: &mut R) -> IoResult<u16> {
    reader
        .read_u16::<LittleEndian>()
        .map_err(|e| IoError::DecodeError(e.to_string()))
}

fn read_u32<R: Read>(reader: &mut R) -> IoResult<u32> {
    reader
        .read_u32::<LittleEndian>()
        .map_err(|e| IoError::DecodeError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bitmap {
        let mut store = PixelStore::new(2, 2);
        store.set_pixel(0, 0, Rgb::new(10, 20, 30)).unwrap(); // top-left
        store.set_pixel(1, 1, Rgb::new(40, 50, 60)).unwrap(); // bottom-right
        Bitmap::from_store(store)
    }

    #[test]
    fn test_header_sizes() {
        let mut buf = Vec::new();
        FileHeader::for_pixel_bytes(0).write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), FILE_HEADER_SIZE as usize);

        buf.clear();
        FrameHeader::new(3, 3).write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), FRAME_HEADER_SIZE as usize);
    }

    #[test]
    fn test_field_layout_little_endian() {
        let bytes = sample().write_to_memory().unwrap();
        assert_eq!(&bytes[0..2], b"BM");
        // file size = 54 + 2*2*3
        assert_eq!(&bytes[2..6], &66u32.to_le_bytes());
        assert_eq!(&bytes[10..14], &54u32.to_le_bytes());
        assert_eq!(&bytes[14..18], &40u32.to_le_bytes());
        assert_eq!(&bytes[18..22], &2u32.to_le_bytes());
        assert_eq!(&bytes[22..26], &2u32.to_le_bytes());
        assert_eq!(&bytes[26..28], &1u16.to_le_bytes());
        assert_eq!(&bytes[28..30], &24u16.to_le_bytes());
    }

    #[test]
    fn test_rows_bottom_to_top_bgr() {
        let bytes = sample().write_to_memory().unwrap();
        let px = &bytes[PIXEL_OFFSET as usize..];
        assert_eq!(px.len(), 12);
        // First disk row is the bottom row: (0,1) black, (1,1) = 40,50,60 as BGR.
        assert_eq!(&px[0..6], &[0, 0, 0, 60, 50, 40]);
        // Second disk row is the top row: (0,0) = 10,20,30 as BGR.
        assert_eq!(&px[6..12], &[30, 20, 10, 0, 0, 0]);
    }

    #[test]
    fn test_decode_reverses_rows() {
        let original = sample();
        let decoded = Bitmap::read_from_memory(&original.write_to_memory().unwrap()).unwrap();
        assert_eq!(decoded.pixels.pixel(0, 0), Rgb::new(10, 20, 30));
        assert_eq!(decoded.pixels.pixel(1, 1), Rgb::new(40, 50, 60));
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_headers_pass_through() {
        let mut bmp = sample();
        bmp.file_header.reserved = -7;
        bmp.frame_header.reserved = [2835, 2835, 0, 0];
        let bytes = bmp.write_to_memory().unwrap();
        let back = Bitmap::read_from_memory(&bytes).unwrap();
        assert_eq!(back.file_header.reserved, -7);
        assert_eq!(back.frame_header.reserved, [2835, 2835, 0, 0]);
        assert_eq!(back.write_to_memory().unwrap(), bytes);
    }

    #[test]
    fn test_truncated_pixels() {
        let bytes = sample().write_to_memory().unwrap();
        let err = Bitmap::read_from_memory(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, IoError::DecodeError(_)));
    }

    #[test]
    fn test_truncated_header() {
        let err = Bitmap::read_from_memory(b"BM\x00").unwrap_err();
        assert!(matches!(err, IoError::DecodeError(_)));
    }

    #[test]
    fn test_header_store_mismatch() {
        let mut bmp = sample();
        bmp.frame_header.width = 3;
        assert!(matches!(bmp.write_to_memory(), Err(IoError::EncodeError(_))));
    }
}
