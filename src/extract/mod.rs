//! Region extraction: cropping detector boxes out of an image and rectifying documents.

/// Four-corner perspective correction.
pub mod document;
/// Box denormalization, expansion, and cropping.
pub mod region;

pub use document::rectify_document;
pub use region::{crop_region, denormalize, expand_and_clamp, extract_regions};
