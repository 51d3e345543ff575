/// A decoded icon image.
///
/// The canonical interchange form used by the chunk codecs is
/// [`PixelFormat::RGBA`]: four interleaved 8-bit channels per pixel,
/// not premultiplied.
#[derive(Clone, Debug)]
pub struct Image {
    pub(crate) format: PixelFormat,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) data: Box<[u8]>,
}

impl Image {
    /// Creates a new image with all pixel data set to zero.
    ///
    /// # Panics
    ///
    /// Panics if the total pixel data size overflows `usize`.  Decoders
    /// working from untrusted headers must validate dimensions before
    /// allocating an image.
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Image {
        let data_bytes = (format.bytes_per_pixel() as usize)
            .checked_mul(width as usize)
            .and_then(|bytes| bytes.checked_mul(height as usize))
            .expect("image dimensions overflow");
        Image {
            format,
            width,
            height,
            data: vec![0u8; data_bytes].into_boxed_slice(),
        }
    }

    /// Returns the format in which this image's pixel data is stored.
    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns a reference to the image's pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a mutable reference to the image's pixel data.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Creates a copy of this image converted to the given pixel format.
    /// If the source image is already in that format, this is equivalent
    /// to simply calling `clone()`.
    ///
    /// Conversions to a format without an alpha channel discard alpha;
    /// conversions from color to grayscale average the color channels.
    pub fn convert_to(&self, format: PixelFormat) -> Image {
        if format == self.format {
            return self.clone();
        }
        let rgba = self.to_rgba_data();
        let data = match format {
            PixelFormat::RGBA => rgba,
            PixelFormat::RGB => {
                let mut data = Vec::with_capacity(rgba.len() / 4 * 3);
                for pixel in rgba.chunks_exact(4) {
                    data.extend_from_slice(&pixel[..3]);
                }
                data.into_boxed_slice()
            }
            PixelFormat::GrayAlpha => {
                let mut data = Vec::with_capacity(rgba.len() / 2);
                for pixel in rgba.chunks_exact(4) {
                    data.push(luma(pixel));
                    data.push(pixel[3]);
                }
                data.into_boxed_slice()
            }
            PixelFormat::Gray => rgba.chunks_exact(4).map(luma).collect(),
            PixelFormat::Alpha => {
                rgba.chunks_exact(4).map(|pixel| pixel[3]).collect()
            }
        };
        Image { format, width: self.width, height: self.height, data }
    }

    /// Extracts one channel plane as a contiguous byte sequence of length
    /// `width * height`, sampling the pixel data at the format's stride
    /// starting from the given channel offset.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid channel index for this image's
    /// pixel format.
    pub fn channel(&self, index: usize) -> Vec<u8> {
        let stride = self.format.bytes_per_pixel() as usize;
        assert!(index < stride, "no channel {} in {:?}", index, self.format);
        self.data.iter().skip(index).step_by(stride).copied().collect()
    }

    /// Returns a fresh RGBA image whose color channels come from this
    /// image and whose alpha plane is replaced wholesale by the given
    /// single-channel mask.  Both images must have the same dimensions.
    pub(crate) fn with_mask_alpha(&self, mask: &Image) -> Image {
        debug_assert_eq!(mask.format, PixelFormat::Alpha);
        debug_assert_eq!((self.width, self.height), (mask.width, mask.height));
        let mut combined = self.convert_to(PixelFormat::RGBA);
        for (pixel, &alpha) in
            combined.data.chunks_exact_mut(4).zip(mask.data.iter())
        {
            pixel[3] = alpha;
        }
        combined
    }

    fn to_rgba_data(&self) -> Box<[u8]> {
        match self.format {
            PixelFormat::RGBA => self.data.clone(),
            PixelFormat::RGB => {
                let mut rgba = Vec::with_capacity(self.data.len() / 3 * 4);
                for pixel in self.data.chunks_exact(3) {
                    rgba.extend_from_slice(pixel);
                    rgba.push(u8::MAX);
                }
                rgba.into_boxed_slice()
            }
            PixelFormat::GrayAlpha => {
                let mut rgba = Vec::with_capacity(self.data.len() * 2);
                for pixel in self.data.chunks_exact(2) {
                    rgba.extend_from_slice(&[pixel[0]; 3]);
                    rgba.push(pixel[1]);
                }
                rgba.into_boxed_slice()
            }
            PixelFormat::Gray => {
                let mut rgba = Vec::with_capacity(self.data.len() * 4);
                for &value in self.data.iter() {
                    rgba.extend_from_slice(&[value, value, value, u8::MAX]);
                }
                rgba.into_boxed_slice()
            }
            PixelFormat::Alpha => {
                let mut rgba = Vec::with_capacity(self.data.len() * 4);
                for &alpha in self.data.iter() {
                    rgba.extend_from_slice(&[0, 0, 0, alpha]);
                }
                rgba.into_boxed_slice()
            }
        }
    }
}

fn luma(pixel: &[u8]) -> u8 {
    ((pixel[0] as u32 + pixel[1] as u32 + pixel[2] as u32) / 3) as u8
}

/// A format for storing pixel data in an image.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PixelFormat {
    /// 32-bit color with alpha channel.
    RGBA,
    /// 24-bit color with no alpha.
    RGB,
    /// 8-bit grayscale with 8-bit alpha.
    GrayAlpha,
    /// 8-bit grayscale with no alpha.
    Gray,
    /// 8-bit alpha mask with no color.
    Alpha,
}

impl PixelFormat {
    /// Returns the number of bytes needed to store a single pixel in this
    /// format.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::RGBA => 4,
            PixelFormat::RGB => 3,
            PixelFormat::GrayAlpha => 2,
            PixelFormat::Gray => 1,
            PixelFormat::Alpha => 1,
        }
    }
}
