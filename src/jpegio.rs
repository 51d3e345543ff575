use std::io::{self, Cursor, Error, ErrorKind};

use jpeg_decoder::{Decoder, PixelFormat as JpegPixelFormat};

use crate::image::{Image, PixelFormat};

impl Image {
    /// Reads an image from a JPEG file.
    pub fn read_jpeg(input: &[u8]) -> io::Result<Image> {
        let mut decoder = Decoder::new(Cursor::new(input));
        let pixels = decoder
            .decode()
            .map_err(|err| Error::new(ErrorKind::InvalidData, err))?;
        let info = decoder.info().ok_or_else(|| {
            Error::new(ErrorKind::InvalidData, "missing JPEG image info")
        })?;
        let pixel_format = match info.pixel_format {
            JpegPixelFormat::L8 => PixelFormat::Gray,
            JpegPixelFormat::RGB24 => PixelFormat::RGB,
            other => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("unsupported JPEG pixel format: {:?}", other),
                ));
            }
        };
        // Validate the header-declared dimensions against the decoded
        // byte count before sizing an image buffer from them.
        let expected = (pixel_format.bytes_per_pixel() as usize)
            .checked_mul(usize::from(info.width))
            .and_then(|len| len.checked_mul(usize::from(info.height)));
        if expected != Some(pixels.len()) {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "JPEG output size does not match its header",
            ));
        }
        let mut image = Image::new(
            pixel_format,
            u32::from(info.width),
            u32::from(info.height),
        );
        image.data_mut().copy_from_slice(&pixels);
        Ok(image)
    }
}
