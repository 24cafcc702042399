//! Owned byte buffers for a single color channel.
//!
//! A [`ColorPlane`] is one channel of a [`crate::PixelStore`], flattened
//! row-major. A [`PlaneSlice`] is the contiguous run of a plane assigned to
//! one rank. Both are moved by value across every transport boundary, so a
//! rank only ever holds bytes it owns.

use crate::error::{Error, Result};
use crate::pixel::Channel;

/// One channel's worth of pixel bytes, `width * height` long.
#[derive(Clone, PartialEq, Eq)]
pub struct ColorPlane {
    channel: Channel,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ColorPlane {
    /// Wraps a byte buffer, checking it matches the dimensions.
    pub fn new(channel: Channel, width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::size_mismatch(expected, data.len()));
        }
        Ok(Self::from_raw(channel, width, height, data))
    }

    pub(crate) fn from_raw(channel: Channel, width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            channel,
            width,
            height,
            data,
        }
    }

    /// Channel this plane carries.
    #[inline]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Image width the plane was taken from.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height the plane was taken from.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns (width, height).
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Plane length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-sized image.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes, row-major.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the plane, returning its bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Copies out the `count` bytes owned by `rank`.
    ///
    /// The slice covers `[rank * count, (rank + 1) * count)`.
    pub fn slice(&self, rank: usize, count: usize) -> Result<PlaneSlice> {
        let offset = rank * count;
        let end = offset + count;
        if end > self.data.len() {
            return Err(Error::size_mismatch(end, self.data.len()));
        }
        Ok(PlaneSlice {
            channel: self.channel,
            offset,
            data: self.data[offset..end].to_vec(),
        })
    }

    /// Copies a slice back to the position it was taken from.
    pub fn write_slice(&mut self, slice: &PlaneSlice) -> Result<()> {
        let end = slice.offset + slice.len();
        if end > self.data.len() {
            return Err(Error::size_mismatch(end, self.data.len()));
        }
        if slice.channel != self.channel {
            return Err(Error::ChannelMismatch {
                expected: self.channel,
                got: slice.channel,
            });
        }
        self.data[slice.offset..end].copy_from_slice(&slice.data);
        Ok(())
    }
}

impl std::fmt::Debug for ColorPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorPlane")
            .field("channel", &self.channel)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.data.len())
            .finish()
    }
}

/// The part of a plane held by a single rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneSlice {
    channel: Channel,
    offset: usize,
    data: Vec<u8>,
}

impl PlaneSlice {
    /// Creates a slice that starts at `offset` within its plane.
    pub fn new(channel: Channel, offset: usize, data: Vec<u8>) -> Self {
        Self {
            channel,
            offset,
            data,
        }
    }

    /// Channel of the plane this slice came from.
    #[inline]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Byte offset of the slice within its plane.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Slice length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the slice holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the slice contents, keeping channel and offset.
    pub fn replace_data(&mut self, data: Vec<u8>) -> Result<()> {
        if data.len() != self.data.len() {
            return Err(Error::size_mismatch(self.data.len(), data.len()));
        }
        self.data = data;
        Ok(())
    }

    /// Consumes the slice, returning its bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
