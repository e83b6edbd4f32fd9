use std::borrow::Cow;

use image::imageops;

use crate::raster::image::Image;

/// How stored pixels must be turned to appear upright.
///
/// Rotations are clockwise. Mirrored EXIF orientations are carried as
/// [`Orientation::Unsupported`] and never rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Pixels are already upright (EXIF 1).
    #[default]
    Identity,
    /// Rotate 90° clockwise to display (EXIF 6).
    Rotate90,
    /// Rotate 180° to display (EXIF 3).
    Rotate180,
    /// Rotate 270° clockwise, i.e. 90° counter-clockwise, to display (EXIF 8).
    Rotate270,
    /// Any other stored value, kept verbatim.
    Unsupported(u8),
}

impl Orientation {
    /// Map an EXIF orientation tag.
    pub fn from_exif(value: u8) -> Self {
        match value {
            1 => Self::Identity,
            6 => Self::Rotate90,
            3 => Self::Rotate180,
            8 => Self::Rotate270,
            other => Self::Unsupported(other),
        }
    }

    /// EXIF tag for this orientation.
    pub fn to_exif(self) -> u8 {
        match self {
            Self::Identity => 1,
            Self::Rotate90 => 6,
            Self::Rotate180 => 3,
            Self::Rotate270 => 8,
            Self::Unsupported(v) => v,
        }
    }

    /// Map a clockwise display rotation in degrees; only multiples of 90 are recognized.
    pub fn from_rotation_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            0 => Self::Identity,
            90 => Self::Rotate90,
            180 => Self::Rotate180,
            270 => Self::Rotate270,
            _ => Self::Unsupported(0),
        }
    }

    /// `true` for a quarter turn, which swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Rotate90 | Self::Rotate270)
    }

    pub(crate) fn from_decoder(value: image::metadata::Orientation) -> Self {
        use image::metadata::Orientation as Exif;
        match value {
            Exif::NoTransforms => Self::Identity,
            Exif::Rotate90 => Self::Rotate90,
            Exif::Rotate180 => Self::Rotate180,
            Exif::Rotate270 => Self::Rotate270,
            Exif::FlipHorizontal => Self::Unsupported(2),
            Exif::FlipVertical => Self::Unsupported(4),
            Exif::Rotate90FlipH => Self::Unsupported(5),
            Exif::Rotate270FlipH => Self::Unsupported(7),
        }
    }
}

/// Bake the stored rotation into pixel data and relabel the image as upright.
///
/// Unsupported orientations pass through untouched, so geometry degrades to a wrong crop instead
/// of failing. `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(image: Image) -> Image {
    let (pixels, orientation) = image.into_parts();
    let upright = match orientation {
        Orientation::Identity => pixels,
        Orientation::Rotate90 => imageops::rotate90(&pixels),
        Orientation::Rotate180 => imageops::rotate180(&pixels),
        Orientation::Rotate270 => imageops::rotate270(&pixels),
        Orientation::Unsupported(_) => return Image::with_orientation(pixels, orientation),
    };
    if orientation != Orientation::Identity {
        tracing::debug!(?orientation, "baked orientation into pixels");
    }
    Image::new(upright)
}

/// Borrowing variant of [`normalize`] that only copies when a rotation is needed.
pub fn normalized(image: &Image) -> Cow<'_, Image> {
    match image.orientation() {
        Orientation::Identity | Orientation::Unsupported(_) => Cow::Borrowed(image),
        _ => Cow::Owned(normalize(image.clone())),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/orientation.rs"]
mod tests;
