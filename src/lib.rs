//! Library for encoding/decoding Apple Icon Image (.icns) files.
//!
//! An `.icns` file is a sequence of tagged, length-prefixed chunks, each
//! holding one icon image at a fixed square resolution.  Depending on the
//! chunk tag the pixel data is stored as RLE-compressed color planes with
//! a separate alpha-mask chunk (the oldest formats), as RLE-compressed
//! ARGB planes behind a literal header (transitional), or as an embedded
//! PNG or JPEG file (modern).
//!
//! See <https://en.wikipedia.org/wiki/Apple_Icon_Image_format> for more
//! information about the file format.
//!
//! # Example
//!
//! ```no_run
//! use icnskit::Icns;
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = BufReader::new(File::open("app.icns").unwrap());
//! let icns = Icns::read(file).unwrap();
//! if let Some(image) = icns.highest_resolution() {
//!     println!("{}x{}", image.width(), image.height());
//! }
//! ```

#![warn(missing_docs)]

mod binary;
mod codec;
mod container;
mod format;
mod image;
mod jpegio;
mod pngio;
mod rle;

pub use container::{Asset, Icns};
pub use format::{Compatibility, Format, OSType};
pub use format::{image_format, image_formats, mask_format};
pub use image::{Image, PixelFormat};
