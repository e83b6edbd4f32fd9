use super::*;

#[test]
fn tall_subject_over_wide_background_is_height_driven() {
    let subject = Size::new(1000.0, 2000.0);
    let background = Size::new(4000.0, 1000.0);
    let scale = scale_to_cover(subject, background);
    assert_eq!(scale, 2.0);

    let scaled = Size::new(background.width * scale, background.height * scale);
    assert_eq!(scaled, Size::new(8000.0, 2000.0));

    let crop = centered_crop_rect(scaled, subject);
    assert_eq!(crop.center(), kurbo::Point::new(4000.0, 1000.0));
    assert_eq!(crop.size(), subject);
    assert_eq!(crop, Rect::new(3500.0, 0.0, 4500.0, 2000.0));
}

#[test]
fn scale_to_cover_never_picks_fit() {
    let dims = [1.0, 3.0, 17.0, 640.0, 1080.0, 1920.0, 4000.0];
    for &sw in &dims {
        for &sh in &dims {
            for &rw in &dims {
                for &rh in &dims {
                    let s = scale_to_cover(Size::new(sw, sh), Size::new(rw, rh));
                    let eps = 1e-9 * s.max(1.0) * rw.max(rh);
                    assert!(rw * s + eps >= sw, "{sw}x{sh} over {rw}x{rh}");
                    assert!(rh * s + eps >= sh, "{sw}x{sh} over {rw}x{rh}");
                    let fit = (sw / rw).min(sh / rh);
                    assert!(s >= fit);
                }
            }
        }
    }
}

#[test]
fn align_to_origin_moves_min_corner() {
    let rect = Rect::new(3500.0, -12.5, 4500.0, 100.0);
    let t = align_to_origin(rect);
    let moved = rect + t;
    assert_eq!(moved.x0, 0.0);
    assert_eq!(moved.y0, 0.0);
    assert_eq!(moved.size(), rect.size());
}

#[test]
fn cover_source_crop_stays_inside_the_reference() {
    let cases = [
        ((1000, 2000), (4000, 1000)),
        ((3, 7), (5, 5)),
        ((641, 479), (1920, 1080)),
        ((1080, 1920), (1, 1)),
        ((99, 101), (100, 99)),
        ((30, 40), (8000, 2)),
    ];
    for (subject, reference) in cases {
        let (x, y, w, h) = cover_source_crop(subject, reference);
        assert!(w >= 1 && h >= 1, "{subject:?} {reference:?}");
        assert!(x + w <= reference.0 && y + h <= reference.1, "{subject:?} {reference:?}");
    }
}

#[test]
fn cover_source_crop_matches_scaled_crop_geometry() {
    // Scale 2: a 1000x2000 crop of the 8000x2000 scaled image is 500x1000 in source pixels.
    assert_eq!(cover_source_crop((1000, 2000), (4000, 1000)), (1750, 0, 500, 1000));
    assert_eq!(cover_source_crop((10, 10), (30, 10)), (10, 0, 10, 10));
}

#[test]
fn cover_source_crop_of_a_panorama_stays_small() {
    // Scaling first would need a 160000x4000 intermediate.
    assert_eq!(cover_source_crop((3000, 4000), (8000, 200)), (3925, 0, 150, 200));
    assert_eq!(cover_source_crop((30, 40), (8000, 2)), (3999, 0, 2, 2));
}

#[test]
fn centered_crop_origin_stays_inside() {
    assert_eq!(centered_crop_origin((8000, 2000), (1000, 2000)), (3500, 0));
    assert_eq!(centered_crop_origin((5, 5), (2, 2)), (1, 1));
    assert_eq!(centered_crop_origin((4, 4), (4, 4)), (0, 0));
    let (x, y) = centered_crop_origin((3, 3), (4, 4));
    assert_eq!((x, y), (0, 0));
}
