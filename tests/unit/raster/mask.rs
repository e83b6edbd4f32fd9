use super::*;

#[test]
fn filled_masks_quantize_endpoints_exactly() {
    let one = Mask::filled(3, 2, 1.0);
    let zero = Mask::filled(3, 2, 0.0);
    assert!(one.luma().as_raw().iter().all(|&v| v == 255));
    assert!(zero.is_blank());
    assert_eq!(one.weight_at(2, 1), 1.0);
}

#[test]
fn resize_hits_exact_target_extent() {
    let m = Mask::from_fn(7, 3, |x, _| x as f32 / 6.0);
    let r = m.resized_to(20, 11).unwrap();
    assert_eq!(r.dimensions(), (20, 11));
}

#[test]
fn resize_is_deterministic() {
    let m = Mask::from_fn(9, 5, |x, y| ((x * 7 + y * 3) % 11) as f32 / 10.0);
    let a = m.resized_to(31, 17).unwrap();
    let b = m.resized_to(31, 17).unwrap();
    assert_eq!(a, b);
}

#[test]
fn uniform_masks_survive_resampling() {
    let m = Mask::filled(4, 4, 1.0).resized_to(13, 9).unwrap();
    assert!(m.luma().as_raw().iter().all(|&v| v == 255));
    let m = Mask::filled(4, 4, 0.0).resized_to(13, 9).unwrap();
    assert!(m.is_blank());
}

#[test]
fn resize_rejects_zero_extents() {
    assert!(Mask::filled(2, 2, 1.0).resized_to(0, 3).is_err());
    assert!(Mask::filled(0, 2, 1.0).resized_to(3, 3).is_err());
}

#[test]
fn image_round_trip_keeps_weights() {
    let m = Mask::from_fn(4, 3, |x, y| (x + y) as f32 / 5.0);
    let back = Mask::from_image(&m.to_image());
    assert_eq!(back, m);
}
