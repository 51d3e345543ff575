//! The per-chunk pixel codecs.
//!
//! Which codec runs is decided solely by the chunk tag via the format
//! registry; payload contents are never sniffed for dispatch.  Only the
//! embedded-image codec internally distinguishes its two sub-formats.

use std::io::{self, Cursor, Error, ErrorKind};

use crate::image::{Image, PixelFormat};
use crate::rle;

/// The four ways a chunk body encodes pixel data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Codec {
    /// RLE-compressed R, G and B planes; alpha lives in a separate mask
    /// chunk.
    Pack,
    /// An uncompressed 8-bit alpha plane.
    Mask,
    /// A literal "ARGB" header followed by RLE-compressed A, R, G and B
    /// planes.
    Argb,
    /// An embedded JPEG or PNG file; always re-encoded as PNG.
    Image,
}

const ARGB_HEADER: &[u8; 4] = b"ARGB";

impl Codec {
    /// Decodes a chunk body into an image.  `resolution` is supplied by
    /// the format registry because the packed and mask payloads do not
    /// describe their own dimensions.  The returned string names the
    /// concrete encoding that matched (diagnostic only).
    pub(crate) fn decode(
        self,
        body: &[u8],
        resolution: u32,
    ) -> io::Result<(Image, &'static str)> {
        match self {
            Codec::Pack => decode_pack(body, resolution),
            Codec::Mask => decode_mask(body, resolution),
            Codec::Argb => decode_argb(body, resolution),
            Codec::Image => decode_image(body),
        }
    }

    /// Encodes an image into a chunk body.
    pub(crate) fn encode(self, image: &Image) -> io::Result<Vec<u8>> {
        match self {
            Codec::Pack => {
                let rgba = image.convert_to(PixelFormat::RGBA);
                let mut body = Vec::new();
                for channel in 0..3 {
                    body.extend_from_slice(&rle::encode(
                        &rgba.channel(channel),
                    ));
                }
                Ok(body)
            }
            Codec::Mask => {
                Ok(image.convert_to(PixelFormat::RGBA).channel(3))
            }
            Codec::Argb => {
                let rgba = image.convert_to(PixelFormat::RGBA);
                let mut body = ARGB_HEADER.to_vec();
                body.extend_from_slice(&rle::encode(&rgba.channel(3)));
                for channel in 0..3 {
                    body.extend_from_slice(&rle::encode(
                        &rgba.channel(channel),
                    ));
                }
                Ok(body)
            }
            Codec::Image => {
                let mut body = Vec::new();
                image.write_png(&mut body)?;
                Ok(body)
            }
        }
    }
}

// The packed payload is one RLE stream that decompresses to three
// consecutive channel planes (not per-pixel interleaved).
fn decode_pack(
    body: &[u8],
    resolution: u32,
) -> io::Result<(Image, &'static str)> {
    let flat = rle::decode(body)?;
    let size = (resolution * resolution) as usize;
    if flat.len() != 3 * size {
        return Err(plane_length_error(flat.len(), 3 * size));
    }
    let mut image = Image::new(PixelFormat::RGBA, resolution, resolution);
    let pixels = image.data_mut();
    for i in 0..size {
        pixels[i * 4] = flat[i];
        pixels[i * 4 + 1] = flat[size + i];
        pixels[i * 4 + 2] = flat[2 * size + i];
        pixels[i * 4 + 3] = 0xff;
    }
    Ok((image, "icon"))
}

fn decode_mask(
    body: &[u8],
    resolution: u32,
) -> io::Result<(Image, &'static str)> {
    let size = (resolution * resolution) as usize;
    if body.len() != size {
        return Err(plane_length_error(body.len(), size));
    }
    let mut image = Image::new(PixelFormat::Alpha, resolution, resolution);
    image.data_mut().copy_from_slice(body);
    Ok((image, "mask"))
}

fn decode_argb(
    body: &[u8],
    resolution: u32,
) -> io::Result<(Image, &'static str)> {
    if body.len() < ARGB_HEADER.len() {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "ARGB chunk shorter than its header",
        ));
    }
    let flat = rle::decode(&body[ARGB_HEADER.len()..])?;
    let size = (resolution * resolution) as usize;
    if flat.len() != 4 * size {
        return Err(plane_length_error(flat.len(), 4 * size));
    }
    let mut image = Image::new(PixelFormat::RGBA, resolution, resolution);
    let pixels = image.data_mut();
    for i in 0..size {
        pixels[i * 4] = flat[size + i];
        pixels[i * 4 + 1] = flat[2 * size + i];
        pixels[i * 4 + 2] = flat[3 * size + i];
        pixels[i * 4 + 3] = flat[i];
    }
    Ok((image, "argb"))
}

// Modern chunks embed either a JPEG or a PNG file; try JPEG first, then
// rewind and try PNG.  Both formats carry their own dimensions.
fn decode_image(body: &[u8]) -> io::Result<(Image, &'static str)> {
    if let Ok(image) = Image::read_jpeg(body) {
        return Ok((image.convert_to(PixelFormat::RGBA), "jpeg"));
    }
    let image = Image::read_png(Cursor::new(body))?;
    Ok((image.convert_to(PixelFormat::RGBA), "png"))
}

fn plane_length_error(actual: usize, expected: usize) -> Error {
    Error::new(
        ErrorKind::InvalidData,
        format!(
            "wrong decoded payload length ({} instead of {})",
            actual, expected
        ),
    )
}
