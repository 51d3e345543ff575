//! Chunk tags and the table of supported icon formats.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::codec::Codec;

/// A Macintosh OSType (also known as a ResType), used in ICNS files to
/// identify the type of each chunk.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct OSType(pub [u8; 4]);

impl fmt::Display for OSType {
    fn fmt(&self, out: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let OSType(raw) = self;
        for &byte in raw {
            write!(out, "{}", char::from(byte))?;
        }
        Ok(())
    }
}

impl FromStr for OSType {
    type Err = String;

    fn from_str(input: &str) -> Result<OSType, String> {
        let bytes = input.as_bytes();
        if bytes.len() != 4 {
            Err(format!("OSType string must be 4 bytes (was {})", bytes.len()))
        } else {
            let mut raw = [0u8; 4];
            raw.clone_from_slice(bytes);
            Ok(OSType(raw))
        }
    }
}

/// Compatibility with a macOS version, ordered from oldest to newest.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Compatibility {
    /// Mac OS 8.5
    Allegro,
    /// Mac OS X 10.0
    Cheetah,
    /// Mac OS X 10.5
    Leopard,
    /// Mac OS X 10.7
    Lion,
    /// OS X 10.8
    MountainLion,
}

impl Compatibility {
    /// The oldest supported version.
    pub const OLDEST: Compatibility = Compatibility::Allegro;
    /// The newest supported version.
    pub const NEWEST: Compatibility = Compatibility::MountainLion;
}

/// Describes one supported chunk format: its tag, the tag of the
/// separately stored mask chunk (legacy formats only), the square
/// resolution in pixels, the oldest OS version associated with the
/// format, and the codec that translates its payload.
#[derive(Debug)]
pub struct Format {
    pub(crate) code: OSType,
    pub(crate) mask_code: Option<OSType>,
    pub(crate) resolution: u32,
    pub(crate) compat: Compatibility,
    pub(crate) codec: Codec,
}

impl Format {
    /// Returns the chunk tag for this format (e.g. `it32` or `ic08`).
    pub fn code(&self) -> OSType {
        self.code
    }

    /// Returns the tag of the paired mask chunk, if this format stores
    /// its alpha channel separately.
    pub fn mask_code(&self) -> Option<OSType> {
        self.mask_code
    }

    /// Returns the width and height of images in this format, in pixels.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Returns the oldest OS version this format is associated with.
    pub fn compatibility(&self) -> Compatibility {
        self.compat
    }
}

struct Registry {
    images: HashMap<OSType, Format>,
    masks: HashMap<OSType, Format>,
    // Image tags in registration order, for deterministic iteration.
    ordered: Vec<OSType>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(build_registry)
}

fn build_registry() -> Registry {
    let mut images = HashMap::new();
    let mut masks = HashMap::new();
    let mut ordered = Vec::new();

    let legacy: [(&[u8; 4], &[u8; 4], u32); 4] = [
        (b"is32", b"s8mk", 16),
        (b"il32", b"l8mk", 32),
        (b"ih32", b"h8mk", 48),
        (b"it32", b"t8mk", 128),
    ];
    for (code, mask, resolution) in legacy {
        let code = OSType(*code);
        let mask = OSType(*mask);
        images.insert(
            code,
            Format {
                code,
                mask_code: Some(mask),
                resolution,
                compat: Compatibility::Allegro,
                codec: Codec::Pack,
            },
        );
        masks.insert(
            mask,
            Format {
                code: mask,
                mask_code: Some(code),
                resolution,
                compat: Compatibility::Allegro,
                codec: Codec::Mask,
            },
        );
        ordered.push(code);
    }

    let argb: [(&[u8; 4], u32); 2] = [(b"ic04", 16), (b"ic05", 32)];
    for (code, resolution) in argb {
        let code = OSType(*code);
        images.insert(
            code,
            Format {
                code,
                mask_code: None,
                resolution,
                compat: Compatibility::Cheetah,
                codec: Codec::Argb,
            },
        );
        ordered.push(code);
    }

    let modern: [(&[u8; 4], u32, Compatibility); 11] = [
        (b"icp4", 16, Compatibility::Lion),
        (b"icp5", 32, Compatibility::Lion),
        (b"icp6", 64, Compatibility::Lion),
        (b"ic07", 128, Compatibility::Lion),
        (b"ic08", 256, Compatibility::Leopard),
        (b"ic09", 512, Compatibility::Leopard),
        (b"ic10", 1024, Compatibility::Lion),
        (b"ic11", 32, Compatibility::MountainLion),
        (b"ic12", 64, Compatibility::MountainLion),
        (b"ic13", 256, Compatibility::MountainLion),
        (b"ic14", 512, Compatibility::MountainLion),
    ];
    for (code, resolution, compat) in modern {
        let code = OSType(*code);
        images.insert(
            code,
            Format {
                code,
                mask_code: None,
                resolution,
                compat,
                codec: Codec::Image,
            },
        );
        ordered.push(code);
    }

    Registry { images, masks, ordered }
}

/// Looks up the image format registered for the given chunk tag.
pub fn image_format(code: OSType) -> Option<&'static Format> {
    registry().images.get(&code)
}

/// Looks up the mask format registered for the given chunk tag.
pub fn mask_format(code: OSType) -> Option<&'static Format> {
    registry().masks.get(&code)
}

/// Iterates over all registered image formats, in registration order.
pub fn image_formats() -> impl Iterator<Item = &'static Format> {
    let registry = registry();
    registry.ordered.iter().map(move |code| &registry.images[code])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ostype_to_and_from_str() {
        let ostype = OSType::from_str("abcd").expect("failed to parse OSType");
        assert_eq!(ostype.to_string(), "abcd".to_string());
    }

    #[test]
    fn ostype_from_str_failure() {
        assert_eq!(
            OSType::from_str("abc"),
            Err("OSType string must be 4 bytes (was 3)".to_string())
        );
        assert_eq!(
            OSType::from_str("abcde"),
            Err("OSType string must be 4 bytes (was 5)".to_string())
        );
    }

    #[test]
    fn compatibility_is_ordered() {
        assert!(Compatibility::Allegro < Compatibility::Cheetah);
        assert!(Compatibility::Lion < Compatibility::MountainLion);
        assert_eq!(Compatibility::OLDEST, Compatibility::Allegro);
        assert_eq!(Compatibility::NEWEST, Compatibility::MountainLion);
    }

    #[test]
    fn legacy_formats_are_paired_both_ways() {
        let image = image_format(OSType(*b"il32")).unwrap();
        assert_eq!(image.mask_code(), Some(OSType(*b"l8mk")));
        assert_eq!(image.resolution(), 32);
        assert_eq!(image.compatibility(), Compatibility::Allegro);
        let mask = mask_format(OSType(*b"l8mk")).unwrap();
        assert_eq!(mask.mask_code(), Some(OSType(*b"il32")));
        assert_eq!(mask.resolution(), 32);
    }

    #[test]
    fn mask_tags_are_not_image_tags() {
        assert!(image_format(OSType(*b"s8mk")).is_none());
        assert!(mask_format(OSType(*b"is32")).is_none());
    }

    #[test]
    fn unknown_tag_is_not_an_error() {
        assert!(image_format(OSType(*b"quux")).is_none());
        assert!(mask_format(OSType(*b"quux")).is_none());
    }

    #[test]
    fn registry_covers_all_documented_tags() {
        assert_eq!(image_formats().count(), 17);
        for tag in ["ic04", "ic05"] {
            let format = image_format(OSType::from_str(tag).unwrap()).unwrap();
            assert_eq!(format.compatibility(), Compatibility::Cheetah);
        }
        let ic10 = image_format(OSType(*b"ic10")).unwrap();
        assert_eq!(ic10.resolution(), 1024);
        assert_eq!(ic10.compatibility(), Compatibility::Lion);
    }
}
