//! Reading and writing the size-framed chunk stream, plus the icon-family
//! surface built on top of it.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Error, ErrorKind, Read, Write};
use std::ptr;

use crate::binary;
use crate::codec::Codec;
use crate::format::{self, Compatibility, Format, OSType};
use crate::image::{Image, PixelFormat};

/// The first four bytes of an ICNS file.
const ICNS_MAGIC: OSType = OSType(*b"icns");

/// The length of the file header and of each chunk header, in bytes.
const HEADER_LENGTH: usize = 8;

/// One decoded entry of an ICNS file: the format descriptor it was read
/// under, the decoded image (absent for metadata-only decodes), and the
/// name of the concrete encoding that matched.
#[derive(Debug)]
pub struct Asset {
    format: &'static Format,
    image: Option<Image>,
    source: Option<&'static str>,
}

impl Asset {
    /// Returns the format descriptor for this asset.
    pub fn format(&self) -> &'static Format {
        self.format
    }

    /// Returns the decoded image, if pixel data was decoded.
    pub fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    /// Returns the name of the encoding the asset was decoded from (for
    /// example `"png"` or `"jpeg"` for an embedded-image chunk), or
    /// `None` for images added by the caller.
    pub fn source_encoding(&self) -> Option<&'static str> {
        self.source
    }
}

/// A set of icons stored in a single ICNS file.
#[derive(Debug)]
pub struct Icns {
    min_compat: Compatibility,
    max_compat: Compatibility,
    assets: Vec<Asset>,
    unsupported: Vec<OSType>,
    skipped: Vec<OSType>,
}

impl Icns {
    /// Creates a new, empty icon container accepting the full
    /// compatibility range.
    pub fn new() -> Icns {
        Icns::with_compatibility(Compatibility::OLDEST, Compatibility::NEWEST)
    }

    /// Creates a new, empty icon container.  [`Icns::add`] will only
    /// register images under formats within the given compatibility
    /// range.
    pub fn with_compatibility(
        min: Compatibility,
        max: Compatibility,
    ) -> Icns {
        Icns {
            min_compat: min,
            max_compat: max,
            assets: Vec::new(),
            unsupported: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Reads an icon container from an ICNS file (or other reader),
    /// decoding every recognized chunk.
    ///
    /// Individual chunks that fail to decode are skipped (and recorded in
    /// [`Icns::skipped`]) rather than failing the whole file; only a
    /// wrong magic header is fatal.
    pub fn read<R: Read>(mut reader: R) -> io::Result<Icns> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        parse(&data, false)
    }

    /// Reads only the chunk directory of an ICNS file: every recognized
    /// image chunk yields an [`Asset`] with no pixel data, so formats and
    /// dimensions can be inspected without running any pixel codec.  Mask
    /// chunks are skipped entirely.
    pub fn read_metadata<R: Read>(mut reader: R) -> io::Result<Icns> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        parse(&data, true)
    }

    /// Writes the icon container to an ICNS file (or other writer), in
    /// asset order.
    ///
    /// Assets whose format stores alpha separately are written as two
    /// chunks, the mask chunk first so that readers pairing masks by
    /// prior position can recombine them.  Assets without pixel data
    /// (from [`Icns::read_metadata`]) are not written.  Any encoding
    /// failure aborts the whole write.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut chunks: Vec<(OSType, Vec<u8>)> = Vec::new();
        for asset in &self.assets {
            let image = match &asset.image {
                Some(image) => image,
                None => continue,
            };
            if let Some(mask_code) = asset.format.mask_code {
                // Both encoders want the canonical form; convert once.
                let rgba = image.convert_to(PixelFormat::RGBA);
                chunks.push((mask_code, Codec::Mask.encode(&rgba)?));
                chunks.push((
                    asset.format.code,
                    asset.format.codec.encode(&rgba)?,
                ));
            } else {
                chunks.push((
                    asset.format.code,
                    asset.format.codec.encode(image)?,
                ));
            }
        }

        let total = HEADER_LENGTH
            + chunks
                .iter()
                .map(|(_, body)| HEADER_LENGTH + body.len())
                .sum::<usize>();
        let mut out = binary::Writer::with_capacity(total);
        out.write_tag(ICNS_MAGIC);
        out.write_u32(total as u32);
        for (code, body) in &chunks {
            out.write_tag(*code);
            out.write_u32((HEADER_LENGTH + body.len()) as u32);
            out.write_section(body);
        }
        writer.write_all(&out.into_bytes())
    }

    /// Returns the decoded assets, in the order their chunks appeared
    /// (or were added).
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Returns the tags of chunks whose format was not recognized.
    pub fn unsupported(&self) -> &[OSType] {
        &self.unsupported
    }

    /// Returns the tags of recognized chunks that were dropped because
    /// their payload failed to decode.
    pub fn skipped(&self) -> &[OSType] {
        &self.skipped
    }

    /// Returns the oldest compatibility observed while decoding (or the
    /// configured minimum for a container built by hand).
    ///
    /// Decoding starts from an empty window with the bounds inverted, so
    /// a file in which no recognized chunk decoded successfully reports
    /// `min_compatibility() > max_compatibility()` (the newest and
    /// oldest eras, respectively).  Callers can use that ordering to
    /// detect that nothing was observed.
    pub fn min_compatibility(&self) -> Compatibility {
        self.min_compat
    }

    /// Returns the newest compatibility observed while decoding (or the
    /// configured maximum for a container built by hand).
    ///
    /// See [`Icns::min_compatibility`] for the inverted window reported
    /// when decoding observed no recognized chunks.
    pub fn max_compatibility(&self) -> Compatibility {
        self.max_compat
    }

    /// Extracts an image from the icon, at the provided resolution.
    pub fn by_resolution(&self, resolution: u32) -> Option<&Image> {
        self.assets
            .iter()
            .find(|asset| asset.format.resolution == resolution)
            .and_then(|asset| asset.image.as_ref())
    }

    /// Extracts the image from the icon that has the highest resolution.
    pub fn highest_resolution(&self) -> Option<&Image> {
        self.assets
            .iter()
            .filter(|asset| asset.image.is_some())
            .max_by_key(|asset| asset.format.resolution)
            .and_then(|asset| asset.image.as_ref())
    }

    /// Adds a new image to the icon, registering it under every
    /// supported format that matches its resolution and falls within the
    /// container's compatibility range.  Replaces any previous image
    /// held for those formats.  The image must be square.
    pub fn add(&mut self, image: Image) -> io::Result<()> {
        if image.width() != image.height() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "image is not a square",
            ));
        }
        let resolution = image.width();
        let mut supported = false;
        for format in format::image_formats() {
            if format.compat < self.min_compat
                || format.compat > self.max_compat
                || format.resolution != resolution
            {
                continue;
            }
            supported = true;
            let existing = self
                .assets
                .iter_mut()
                .find(|asset| ptr::eq(asset.format, format));
            match existing {
                Some(asset) => {
                    asset.image = Some(image.clone());
                    asset.source = None;
                }
                None => self.assets.push(Asset {
                    format,
                    image: Some(image.clone()),
                    source: None,
                }),
            }
        }
        if !supported {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("no available format for resolution {}", resolution),
            ));
        }
        Ok(())
    }
}

impl Default for Icns {
    fn default() -> Icns {
        Icns::new()
    }
}

impl fmt::Display for Icns {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            out,
            "{} images:",
            self.assets.len() + self.unsupported.len()
        )?;
        for asset in &self.assets {
            writeln!(
                out,
                "[{}] {} image with resolution {}",
                asset.format.code,
                asset.source.unwrap_or("undecoded"),
                asset.format.resolution
            )?;
        }
        for code in &self.unsupported {
            writeln!(out, "[{}] unsupported image format", code)?;
        }
        Ok(())
    }
}

fn parse(data: &[u8], meta_only: bool) -> io::Result<Icns> {
    let mut reader = binary::Reader::new(data);
    let magic = reader.read_tag()?;
    if magic != ICNS_MAGIC {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "not an icns file (wrong magic literal)",
        ));
    }
    // The declared total size is not validated against the actual stream
    // length; chunk framing below is bounds-checked on its own.
    let _declared_size = reader.read_u32()?;

    let mut icns = Icns::with_compatibility(
        Compatibility::NEWEST,
        Compatibility::OLDEST,
    );
    let mut masks: HashMap<OSType, Image> = HashMap::new();

    while !reader.is_empty() {
        let code = match reader.read_tag() {
            Ok(code) => code,
            // Trailing bytes too short for a chunk header; keep what we
            // have.
            Err(_) => break,
        };
        let body = match reader
            .read_u32()
            .map(|length| length as usize)
            .and_then(|length| {
                length.checked_sub(HEADER_LENGTH).ok_or_else(|| {
                    Error::new(ErrorKind::InvalidData, "chunk length under 8")
                })
            })
            .and_then(|length| reader.section(length))
        {
            Ok(body) => body,
            Err(_) => {
                // The declared length is impossible; nothing after this
                // point can be framed reliably.
                icns.skipped.push(code);
                break;
            }
        };

        if let Some(mask_fmt) = format::mask_format(code) {
            if meta_only {
                continue;
            }
            match mask_fmt.codec.decode(body, mask_fmt.resolution) {
                Ok((mask, _)) => {
                    icns.observe(mask_fmt.compat);
                    masks.insert(code, mask);
                }
                Err(_) => icns.skipped.push(code),
            }
            continue;
        }

        if let Some(image_fmt) = format::image_format(code) {
            if meta_only {
                icns.observe(image_fmt.compat);
                icns.assets.push(Asset {
                    format: image_fmt,
                    image: None,
                    source: None,
                });
                continue;
            }
            match image_fmt.codec.decode(body, image_fmt.resolution) {
                Ok((mut image, source)) => {
                    icns.observe(image_fmt.compat);
                    // Recombination only works when the mask chunk
                    // precedes its image chunk, which is how this writer
                    // lays files out; the format itself does not promise
                    // that order.  An image seen first stays opaque.
                    if let Some(mask_code) = image_fmt.mask_code {
                        if let Some(mask) = masks.get(&mask_code) {
                            image = image.with_mask_alpha(mask);
                        }
                    }
                    icns.assets.push(Asset {
                        format: image_fmt,
                        image: Some(image),
                        source: Some(source),
                    });
                }
                Err(_) => icns.skipped.push(code),
            }
            continue;
        }

        icns.unsupported.push(code);
    }

    Ok(icns)
}

impl Icns {
    fn observe(&mut self, compat: Compatibility) {
        if compat < self.min_compat {
            self.min_compat = compat;
        }
        if compat > self.max_compat {
            self.max_compat = compat;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::image_format;
    use std::io::Cursor;

    fn gradient_image(resolution: u32) -> Image {
        let mut image = Image::new(PixelFormat::RGBA, resolution, resolution);
        for (i, byte) in image.data_mut().iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        image
    }

    #[test]
    fn write_empty_icns() {
        let icns = Icns::new();
        assert!(icns.assets().is_empty());
        let mut output: Vec<u8> = vec![];
        icns.write(&mut output).expect("write failed");
        assert_eq!(b"icns\0\0\0\x08", &output as &[u8]);
    }

    #[test]
    fn magic_mismatch_is_fatal() {
        let result = Icns::read(Cursor::new(b"stuf\0\0\0\x08".to_vec()));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn unrecognized_tags_are_recorded_not_fatal() {
        let input: Cursor<&[u8]> =
            Cursor::new(b"icns\0\0\0\x1fquux\0\0\0\x0efoobarbaz!\0\0\0\x09#");
        let icns = Icns::read(input).expect("read failed");
        assert!(icns.assets().is_empty());
        assert_eq!(
            icns.unsupported(),
            &[OSType(*b"quux"), OSType(*b"baz!")]
        );
    }

    #[test]
    fn chunk_overrunning_stream_is_not_fatal() {
        // One valid ic04 chunk followed by a chunk whose declared length
        // exceeds the remaining bytes.
        let mut icns = Icns::new();
        icns.add(gradient_image(16)).unwrap();
        let mut data = Vec::new();
        icns.write(&mut data).unwrap();
        data.extend_from_slice(b"ic05\0\0\xff\xff");
        let reread = Icns::read(Cursor::new(data)).expect("read failed");
        assert_eq!(reread.skipped(), &[OSType(*b"ic05")]);
        assert!(reread.by_resolution(16).is_some());
    }

    #[test]
    fn corrupt_chunk_body_is_skipped() {
        // An ic04 chunk with a garbage RLE payload, then a valid one.
        let mut good = Vec::new();
        {
            let mut icns = Icns::new();
            icns.add(gradient_image(16)).unwrap();
            icns.write(&mut good).unwrap();
        }
        let good_chunks = good[8..].to_vec();
        let mut data = Vec::new();
        data.extend_from_slice(b"icns");
        let bad_body = b"ARGB\xff"; // repeat record with no value byte
        let total = 8 + 8 + bad_body.len() + good_chunks.len();
        data.extend_from_slice(&(total as u32).to_be_bytes());
        data.extend_from_slice(b"ic04");
        data.extend_from_slice(&((8 + bad_body.len()) as u32).to_be_bytes());
        data.extend_from_slice(bad_body);
        data.extend_from_slice(&good_chunks);
        let icns = Icns::read(Cursor::new(data)).expect("read failed");
        assert_eq!(icns.skipped(), &[OSType(*b"ic04")]);
        assert!(icns.by_resolution(16).is_some());
    }

    #[test]
    fn add_registers_every_matching_format() {
        let mut icns = Icns::new();
        icns.add(gradient_image(16)).unwrap();
        let codes: Vec<OSType> =
            icns.assets().iter().map(|a| a.format().code()).collect();
        assert_eq!(
            codes,
            vec![OSType(*b"is32"), OSType(*b"ic04"), OSType(*b"icp4")]
        );
        // Adding again replaces rather than appends.
        icns.add(gradient_image(16)).unwrap();
        assert_eq!(icns.assets().len(), 3);
    }

    #[test]
    fn add_respects_compatibility_window() {
        let mut icns = Icns::with_compatibility(
            Compatibility::Allegro,
            Compatibility::Allegro,
        );
        icns.add(gradient_image(16)).unwrap();
        assert_eq!(icns.assets().len(), 1);
        assert_eq!(icns.assets()[0].format().code(), OSType(*b"is32"));
        // 256 has no legacy format at all.
        assert!(icns.add(gradient_image(256)).is_err());
    }

    #[test]
    fn add_rejects_non_square_and_odd_sizes() {
        let mut icns = Icns::new();
        let tall = Image::new(PixelFormat::RGBA, 16, 32);
        assert!(icns.add(tall).is_err());
        assert!(icns.add(gradient_image(17)).is_err());
    }

    #[test]
    fn resolution_lookups() {
        let mut icns = Icns::new();
        icns.add(gradient_image(16)).unwrap();
        icns.add(gradient_image(64)).unwrap();
        assert!(icns.by_resolution(16).is_some());
        assert!(icns.by_resolution(512).is_none());
        assert_eq!(icns.highest_resolution().unwrap().width(), 64);
    }

    #[test]
    fn image_before_mask_stays_opaque() {
        // Write a legacy icon, then swap the mask chunk behind the image
        // chunk; the ordering assumption means the alpha is lost.
        let mut image = gradient_image(16);
        for pixel in image.data_mut().chunks_exact_mut(4) {
            pixel[3] = 0x55;
        }
        let mut icns = Icns::with_compatibility(
            Compatibility::Allegro,
            Compatibility::Allegro,
        );
        icns.add(image).unwrap();
        let mut data = Vec::new();
        icns.write(&mut data).unwrap();

        // Chunk 1 is the s8mk mask (fixed size), chunk 2 the is32 image.
        let mask_len = 8 + 256;
        let mask_chunk = data[8..8 + mask_len].to_vec();
        let image_chunk = data[8 + mask_len..].to_vec();
        let mut swapped = data[..8].to_vec();
        swapped.extend_from_slice(&image_chunk);
        swapped.extend_from_slice(&mask_chunk);

        let reread = Icns::read(Cursor::new(swapped)).expect("read failed");
        let decoded = reread.by_resolution(16).unwrap();
        assert!(decoded.channel(3).iter().all(|&a| a == 0xff));
    }

    #[test]
    fn metadata_only_decodes_no_pixels() {
        let mut icns = Icns::new();
        icns.add(gradient_image(16)).unwrap();
        icns.add(gradient_image(256)).unwrap();
        let mut data = Vec::new();
        icns.write(&mut data).unwrap();

        let meta = Icns::read_metadata(Cursor::new(data)).expect("read");
        assert!(!meta.assets().is_empty());
        assert!(meta.assets().iter().all(|a| a.image().is_none()));
        assert!(meta
            .assets()
            .iter()
            .any(|a| a.format().resolution() == 256));
        assert!(meta.by_resolution(16).is_none());
        assert_eq!(meta.min_compatibility(), Compatibility::Allegro);
    }

    #[test]
    fn observed_compatibility_range() {
        let mut icns = Icns::new();
        icns.add(gradient_image(1024)).unwrap(); // ic10, Lion only
        let mut data = Vec::new();
        icns.write(&mut data).unwrap();
        let reread = Icns::read(Cursor::new(data)).unwrap();
        assert_eq!(reread.min_compatibility(), Compatibility::Lion);
        assert_eq!(reread.max_compatibility(), Compatibility::Lion);
    }

    #[test]
    fn nothing_decoded_leaves_compatibility_window_inverted() {
        // Only an unrecognized chunk: no observation narrows the window,
        // so the bounds stay inverted (min above max).
        let input: Cursor<&[u8]> =
            Cursor::new(b"icns\0\0\0\x11quux\0\0\0\x09#");
        let icns = Icns::read(input).expect("read failed");
        assert!(icns.assets().is_empty());
        assert_eq!(icns.min_compatibility(), Compatibility::NEWEST);
        assert_eq!(icns.max_compatibility(), Compatibility::OLDEST);
        assert!(icns.min_compatibility() > icns.max_compatibility());
    }

    #[test]
    fn display_lists_assets_and_unknown_tags() {
        let input: Cursor<&[u8]> =
            Cursor::new(b"icns\0\0\0\x11quux\0\0\0\x09#");
        let icns = Icns::read(input).unwrap();
        let info = icns.to_string();
        assert!(info.starts_with("1 images:"));
        assert!(info.contains("[quux] unsupported image format"));
    }

    #[test]
    fn decoded_sources_are_reported() {
        let mut icns = Icns::new();
        icns.add(gradient_image(256)).unwrap();
        let mut data = Vec::new();
        icns.write(&mut data).unwrap();
        let reread = Icns::read(Cursor::new(data)).unwrap();
        let asset = &reread.assets()[0];
        assert_eq!(asset.source_encoding(), Some("png"));
        assert!(ptr::eq(
            asset.format(),
            image_format(asset.format().code()).unwrap()
        ));
    }
}
