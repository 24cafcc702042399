//! The decoded image: a grid of [`Rgb`] triplets.
//!
//! # Memory Layout
//!
//! Pixels are stored **row-major**, top-to-bottom:
//!
//! ```text
//! pixels: [px(0,0) px(1,0) ... px(w-1,0)]  <- row 0 (top)
//!         [px(0,1) px(1,1) ... px(w-1,1)]  <- row 1
//!         ...
//! ```
//!
//! Bitmap files keep rows bottom-to-top; the codec in `rowblur-io` reverses
//! them on the way in and out so this type never sees the disk order.

use crate::error::{Error, Result};
use crate::pixel::{Channel, Rgb};
use crate::plane::ColorPlane;

/// Owned height x width grid of color triplets.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelStore {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl PixelStore {
    /// Creates a black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgb::default())
    }

    /// Creates an image with every pixel set to `px`.
    pub fn filled(width: u32, height: u32, px: Rgb) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![px; len],
        }
    }

    /// Wraps existing top-to-bottom pixel data.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgb>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(Error::size_mismatch(expected, pixels.len()));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns (width, height).
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels, which is also the length of each color plane.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// All pixels, top row first.
    #[inline]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Pixel at (x, y), with y = 0 being the top row.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.pixels[self.offset(x, y)]
    }

    /// Checked pixel access.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x < self.width && y < self.height {
            Some(self.pixel(x, y))
        } else {
            None
        }
    }

    /// Sets the pixel at (x, y).
    pub fn set_pixel(&mut self, x: u32, y: u32, px: Rgb) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        let idx = self.offset(x, y);
        self.pixels[idx] = px;
        Ok(())
    }

    /// One row, with y = 0 being the top row.
    pub fn row(&self, y: u32) -> &[Rgb] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    /// Mutable access to one row.
    pub fn row_mut(&mut self, y: u32) -> &mut [Rgb] {
        let start = y as usize * self.width as usize;
        let w = self.width as usize;
        &mut self.pixels[start..start + w]
    }

    /// Extracts a single channel as a flattened plane.
    pub fn plane(&self, channel: Channel) -> ColorPlane {
        let data = self.pixels.iter().map(|px| px.get(channel)).collect();
        ColorPlane::from_raw(channel, self.width, self.height, data)
    }

    /// Splits the image into its red, green and blue planes.
    pub fn split(&self) -> [ColorPlane; 3] {
        Channel::ALL.map(|c| self.plane(c))
    }

    /// Writes one plane back into the image.
    pub fn write_plane(&mut self, plane: &ColorPlane) -> Result<()> {
        if plane.dimensions() != self.dimensions() {
            return Err(Error::dimension_mismatch(
                self.dimensions(),
                plane.dimensions(),
            ));
        }
        let channel = plane.channel();
        for (px, &v) in self.pixels.iter_mut().zip(plane.data()) {
            px.set(channel, v);
        }
        Ok(())
    }

    /// Rebuilds an image from three planes given in red, green, blue order.
    pub fn from_planes(planes: [ColorPlane; 3]) -> Result<Self> {
        for (plane, expected) in planes.iter().zip(Channel::ALL) {
            if plane.channel() != expected {
                return Err(Error::ChannelMismatch {
                    expected,
                    got: plane.channel(),
                });
            }
        }
        let (width, height) = planes[0].dimensions();
        let mut store = Self::new(width, height);
        for plane in &planes {
            store.write_plane(plane)?;
        }
        Ok(store)
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl std::fmt::Debug for PixelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelStore")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &self.pixels.len())
            .finish()
    }
}
