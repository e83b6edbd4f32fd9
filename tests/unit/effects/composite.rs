use super::*;
use crate::raster::orientation::Orientation;
use image::Rgba;

fn gradient(width: u32, height: u32, seed: u8) -> Image {
    Image::new(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x as u8).wrapping_mul(17).wrapping_add(seed),
            (y as u8).wrapping_mul(29),
            seed,
            255,
        ])
    }))
}

#[test]
fn output_extent_matches_foreground_for_many_pairs() {
    let pairs = [
        ((10, 20), (40, 10)),
        ((16, 9), (9, 16)),
        ((7, 7), (3, 50)),
        ((33, 5), (1, 1)),
        ((8, 8), (8, 8)),
    ];
    for (fg, bg) in pairs {
        let out = composite(
            gradient(fg.0, fg.1, 3),
            &gradient(bg.0, bg.1, 90),
            &Mask::filled(5, 5, 0.5),
        )
        .unwrap();
        assert_eq!(out.dimensions(), fg, "fg {fg:?} bg {bg:?}");
        assert_eq!(out.orientation(), Orientation::Identity);
    }
}

#[test]
fn full_mask_reproduces_foreground_exactly() {
    let fg = gradient(12, 9, 5);
    let out = composite(fg.clone(), &gradient(30, 4, 200), &Mask::filled(3, 3, 1.0)).unwrap();
    assert_eq!(out.pixels(), fg.pixels());
}

#[test]
fn empty_mask_reproduces_background_crop_exactly() {
    let fg = gradient(12, 9, 5);
    let bg = gradient(30, 4, 200);
    let out = composite(fg, &bg, &Mask::filled(12, 9, 0.0)).unwrap();
    let expected = aligned_background(&bg, (12, 9)).unwrap();
    assert_eq!(out.pixels(), &expected);
}

#[test]
fn aligned_background_takes_the_center_of_a_wide_background() {
    // Left third red, middle third green, right third blue; a square subject must land on green.
    let bg = Image::new(RgbaImage::from_fn(30, 10, |x, _| match x {
        0..10 => Rgba([255, 0, 0, 255]),
        10..20 => Rgba([0, 255, 0, 255]),
        _ => Rgba([0, 0, 255, 255]),
    }));
    let aligned = aligned_background(&bg, (10, 10)).unwrap();
    assert_eq!(aligned.dimensions(), (10, 10));
    assert_eq!(aligned.get_pixel(5, 5), &Rgba([0, 255, 0, 255]));
}

#[test]
fn panoramic_background_is_cropped_before_resampling() {
    // An 8000x2 strip covering 30x40 would scale to 160000x40; only its green center is kept.
    let bg = Image::new(RgbaImage::from_fn(8000, 2, |x, _| match x {
        0..3999 => Rgba([255, 0, 0, 255]),
        3999..4001 => Rgba([0, 255, 0, 255]),
        _ => Rgba([0, 0, 255, 255]),
    }));
    let aligned = aligned_background(&bg, (30, 40)).unwrap();
    assert_eq!(aligned.dimensions(), (30, 40));
    assert!(aligned.pixels().all(|p| *p == Rgba([0, 255, 0, 255])));

    let out = composite(gradient(30, 40, 7), &bg, &Mask::filled(1, 1, 0.0)).unwrap();
    assert_eq!(out.pixels(), &aligned);
}

#[test]
fn foreground_orientation_is_baked_before_compositing() {
    let fg = Image::with_orientation(gradient(4, 8, 1).into_pixels(), Orientation::Rotate90);
    let out = composite(fg, &gradient(5, 5, 2), &Mask::filled(1, 1, 1.0)).unwrap();
    assert_eq!(out.dimensions(), (8, 4));
}

#[test]
fn zero_extent_inputs_are_rejected() {
    let empty = Image::new(RgbaImage::new(0, 0));
    let err = composite(empty.clone(), &gradient(4, 4, 0), &Mask::filled(2, 2, 1.0)).unwrap_err();
    assert!(err.to_string().contains("composable inputs required"));
    assert!(composite(gradient(4, 4, 0), &empty, &Mask::filled(2, 2, 1.0)).is_err());
    assert!(composite(gradient(4, 4, 0), &gradient(4, 4, 1), &Mask::filled(0, 0, 1.0)).is_err());
}

#[test]
fn request_runs_composite() {
    let req = CompositeRequest {
        foreground: gradient(6, 6, 1),
        background: gradient(6, 6, 2),
        mask: Mask::filled(6, 6, 1.0),
    };
    let fg = req.foreground.clone();
    assert_eq!(req.run().unwrap(), fg);
}

#[test]
fn blur_variant_keeps_subject_and_softens_background() {
    let img = Image::new(RgbaImage::from_fn(40, 20, |x, _| {
        if x % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    }));
    let mask = Mask::from_fn(40, 20, |x, _| if x < 20 { 1.0 } else { 0.0 });
    let out = blur_variant(img.clone(), &mask, 3.0, BLUR_INSET_FRACTION).unwrap();
    assert_eq!(out.dimensions(), (40, 20));
    for x in 0..20 {
        assert_eq!(out.pixels().get_pixel(x, 10), img.pixels().get_pixel(x, 10));
    }
    let px = out.pixels().get_pixel(30, 10).0[0];
    assert!((64..=192).contains(&px), "background not blurred: {px}");
}

#[test]
fn blur_variant_rejects_bad_inset() {
    let img = gradient(4, 4, 0);
    assert!(blur_variant(img, &Mask::filled(4, 4, 1.0), 1.0, 0.6).is_err());
}

#[test]
fn blend_requires_equal_extents() {
    let a = RgbaImage::new(2, 2);
    let b = RgbaImage::new(3, 2);
    let m = GrayImage::new(2, 2);
    assert!(blend_by_mask(&a, &b, &m).is_err());
}
