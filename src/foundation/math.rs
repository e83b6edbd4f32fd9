pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Weighted blend of two channel values by an 8-bit weight `w` (255 selects `a`).
///
/// `w == 255` returns `a` exactly and `w == 0` returns `b` exactly.
pub(crate) fn lerp_u8(a: u8, b: u8, w: u8) -> u8 {
    let w = u16::from(w);
    let av = mul_div255_u16(u16::from(a), w);
    let bv = mul_div255_u16(u16::from(b), 255 - w);
    (av + bv).min(255) as u8
}

/// Quantize a unit-interval weight to 8 bits.
pub(crate) fn unit_to_u8(v: f32) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
