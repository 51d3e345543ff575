use std::io::{self, BufRead, Error, ErrorKind, Seek, Write};

use crate::image::{Image, PixelFormat};

/// Refuse to decode PNGs whose output would exceed this many bytes; the
/// largest icon in any icns format is 1024x1024 RGBA (4 MiB).
const MAX_OUTPUT_BYTES: usize = 1 << 27;

impl Image {
    /// Reads an image from a PNG file.
    pub fn read_png<R: BufRead + Seek>(input: R) -> io::Result<Image> {
        let mut decoder = png::Decoder::new(input);
        decoder.set_transformations(
            png::Transformations::STRIP_16 | png::Transformations::EXPAND,
        );
        let info = decoder.read_header_info()?;
        let (width, height) = (info.width, info.height);
        let mut reader = decoder.read_info()?;

        let (color_type, bit_depth) = reader.output_color_type();
        if bit_depth != png::BitDepth::Eight {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("unsupported PNG bit depth: {:?}", bit_depth),
            ));
        }
        let pixel_format = match color_type {
            png::ColorType::Rgba => PixelFormat::RGBA,
            png::ColorType::Rgb => PixelFormat::RGB,
            png::ColorType::GrayscaleAlpha => PixelFormat::GrayAlpha,
            png::ColorType::Grayscale => PixelFormat::Gray,
            // EXPAND prevents paletted output.
            png::ColorType::Indexed => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    "unexpected indexed PNG output",
                ));
            }
        };

        // Dimensions come from an untrusted header; size the output
        // buffer with checked arithmetic before allocating anything.
        let buffer_len = (pixel_format.bytes_per_pixel() as usize)
            .checked_mul(width as usize)
            .and_then(|len| len.checked_mul(height as usize))
            .filter(|&len| len <= MAX_OUTPUT_BYTES);
        if buffer_len.is_none() || reader.output_buffer_size() != buffer_len {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "PNG output size does not match its header",
            ));
        }
        let mut image = Image::new(pixel_format, width, height);
        reader.next_frame(image.data_mut())?;
        reader.finish()?;
        Ok(image)
    }

    /// Writes the image to a PNG file.
    pub fn write_png<W: Write>(&self, output: W) -> io::Result<()> {
        let color_type = match self.format {
            PixelFormat::RGBA => png::ColorType::Rgba,
            PixelFormat::RGB => png::ColorType::Rgb,
            PixelFormat::GrayAlpha => png::ColorType::GrayscaleAlpha,
            PixelFormat::Gray => png::ColorType::Grayscale,
            PixelFormat::Alpha => {
                return self
                    .convert_to(PixelFormat::GrayAlpha)
                    .write_png(output);
            }
        };
        let mut encoder = png::Encoder::new(output, self.width, self.height);
        encoder.set_color(color_type);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn png_round_trip() {
        let mut image = Image::new(PixelFormat::RGBA, 3, 2);
        for (i, byte) in image.data_mut().iter_mut().enumerate() {
            *byte = (i * 11) as u8;
        }
        let mut encoded = Vec::new();
        image.write_png(&mut encoded).unwrap();
        let decoded = Image::read_png(Cursor::new(&encoded)).unwrap();
        assert_eq!(decoded.pixel_format(), PixelFormat::RGBA);
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.data(), image.data());
    }

    #[test]
    fn alpha_images_are_written_as_gray_alpha() {
        let mut mask = Image::new(PixelFormat::Alpha, 2, 2);
        mask.data_mut().copy_from_slice(&[1, 2, 3, 4]);
        let mut encoded = Vec::new();
        mask.write_png(&mut encoded).unwrap();
        let decoded = Image::read_png(Cursor::new(&encoded)).unwrap();
        assert_eq!(decoded.pixel_format(), PixelFormat::GrayAlpha);
        assert_eq!(decoded.channel(1), vec![1, 2, 3, 4]);
    }

    #[test]
    fn garbage_is_not_a_png() {
        assert!(Image::read_png(Cursor::new(b"not a png")).is_err());
    }

    #[test]
    fn huge_declared_dimensions_are_an_error_not_a_panic() {
        // A well-formed PNG header (valid chunk CRCs) declaring a
        // 131072x131072 RGBA image; decoding must refuse it without
        // trying to size a buffer for it.
        let data = huge_png();
        assert!(Image::read_png(Cursor::new(&data)).is_err());
    }

    fn huge_png() -> Vec<u8> {
        vec![
            0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, // signature
            0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52, // IHDR
            0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, // 131072 sq
            0x08, 0x06, 0x00, 0x00, 0x00, 0x95, 0x95, 0xe5, // RGBA8
            0xf0, 0x00, 0x00, 0x00, 0x08, 0x49, 0x44, 0x41, // IDAT
            0x54, 0x78, 0x9c, 0x03, 0x00, 0x00, 0x00, 0x00,
            0x01, 0x48, 0x06, 0x89, 0xd2, 0x00, 0x00, 0x00, // IEND
            0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60,
            0x82,
        ]
    }
}
