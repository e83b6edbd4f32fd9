//! Mask-guided compositing and the blurred-background variant.

/// Separable Gaussian blur.
pub mod blur;
/// Foreground/background blending through a soft mask.
pub mod composite;
