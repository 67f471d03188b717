use lazy_canvas::engine::{
    fit_within, fit_within_f64, plan_crop, quantize_channel, watermark_anchor, CropPolicy,
    GridLayout, Size,
};
use lazy_canvas::ops::{CropOptions, WatermarkPosition};
use proptest::prelude::*;

fn valid_crop_strategy() -> impl Strategy<Value = (u32, u32, u32, u32, u32, u32)> {
    (1u32..=512, 1u32..=512)
        .prop_flat_map(|(img_w, img_h)| (Just(img_w), Just(img_h), 1u32..=img_w, 1u32..=img_h))
        .prop_flat_map(|(img_w, img_h, crop_w, crop_h)| {
            (
                Just(img_w),
                Just(img_h),
                Just(crop_w),
                Just(crop_h),
                0u32..=img_w - crop_w,
                0u32..=img_h - crop_h,
            )
        })
}

fn overflowing_crop_strategy() -> impl Strategy<Value = (u32, u32, u32, u32, u32, u32)> {
    (1u32..=512, 1u32..=512)
        .prop_flat_map(|(img_w, img_h)| {
            (
                Just(img_w),
                Just(img_h),
                0u32..img_w,
                0u32..img_h,
            )
        })
        .prop_flat_map(|(img_w, img_h, x, y)| {
            (
                Just(img_w),
                Just(img_h),
                (img_w - x + 1)..=(img_w * 2),
                1u32..=(img_h - y),
                Just(x),
                Just(y),
            )
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn fit_never_upscales(w in 1u32..=4000, h in 1u32..=4000, extra_w in 0u32..=2000, extra_h in 0u32..=2000) {
        let (max_w, max_h) = (w + extra_w, h + extra_h);
        prop_assert_eq!(fit_within(Size::new(w, h), max_w, max_h), Size::new(w, h));
    }

    #[test]
    fn fit_respects_bounds(w in 1u32..=10_000, h in 1u32..=10_000, max_w in 1u32..=4000, max_h in 1u32..=4000) {
        let out = fit_within(Size::new(w, h), max_w, max_h);
        prop_assert!(out.width <= max_w, "{} > {}", out.width, max_w);
        prop_assert!(out.height <= max_h, "{} > {}", out.height, max_h);
        prop_assert!(out.width >= 1 && out.height >= 1);
    }

    #[test]
    fn fit_preserves_aspect_ratio_exactly_before_rounding(
        w in 1u32..=10_000,
        h in 1u32..=10_000,
        max_w in 1u32..=4000,
        max_h in 1u32..=4000,
    ) {
        let (fw, fh) = fit_within_f64(w as f64, h as f64, max_w as f64, max_h as f64);
        let ratio = w as f64 / h as f64;
        prop_assert!(((fw / fh) - ratio).abs() <= ratio * 1e-9);
        prop_assert!(fw <= max_w as f64 + 1e-9 && fh <= max_h as f64 + 1e-9);
    }

    #[test]
    fn fit_rounding_error_is_bounded(
        w in 1u32..=10_000,
        h in 1u32..=10_000,
        max_w in 16u32..=4000,
        max_h in 16u32..=4000,
    ) {
        let (fw, fh) = fit_within_f64(w as f64, h as f64, max_w as f64, max_h as f64);
        // Skip shapes where the 1px floor kicks in.
        prop_assume!(fw >= 1.0 && fh >= 1.0);
        let out = fit_within(Size::new(w, h), max_w, max_h);
        let ratio = w as f64 / h as f64;
        let tolerance = 0.5 * (1.0 + ratio) / out.height as f64 + 1e-9;
        prop_assert!((out.aspect_ratio() - ratio).abs() <= tolerance,
            "{}x{} -> {} (ratio {} vs {})", w, h, out, out.aspect_ratio(), ratio);
    }

    #[test]
    fn grid_has_no_more_than_one_partial_row(n in 1usize..=400) {
        let grid = GridLayout::plan(n, Size::new(10_000, 10_000), 0).unwrap();
        let capacity = grid.capacity();
        prop_assert!(capacity >= n);
        prop_assert!(capacity - n < grid.cols as usize);
        prop_assert!(grid.cols >= grid.rows);
    }

    #[test]
    fn grid_placements_stay_inside_their_cells(
        n in 1usize..=25,
        img_w in 1u32..=3000,
        img_h in 1u32..=3000,
        padding in 0u32..=20,
    ) {
        let grid = GridLayout::plan(n, Size::new(800, 600), padding).unwrap();
        for index in 0..n {
            let cell = grid.cell(index);
            let p = grid.place(index, Size::new(img_w, img_h));
            prop_assert!(p.x >= cell.x - 1e-6 && p.y >= cell.y - 1e-6);
            prop_assert!(p.x + p.width <= cell.x + cell.width + 1e-6);
            prop_assert!(p.y + p.height <= cell.y + cell.height + 1e-6);
            let ratio = img_w as f64 / img_h as f64;
            prop_assert!(((p.width / p.height) - ratio).abs() <= ratio * 1e-9);
        }
    }

    #[test]
    fn in_bounds_crop_is_verbatim_under_every_policy((img_w, img_h, cw, ch, x, y) in valid_crop_strategy()) {
        let crop = CropOptions::new(x, y, cw, ch);
        for policy in [CropPolicy::Strict, CropPolicy::Clamp, CropPolicy::Verbatim] {
            let rect = plan_crop(&crop, Size::new(img_w, img_h), policy).unwrap();
            prop_assert_eq!((rect.x, rect.y, rect.width, rect.height), (x, y, cw, ch));
        }
    }

    #[test]
    fn overflowing_crop_strict_rejects_clamp_fits((img_w, img_h, cw, ch, x, y) in overflowing_crop_strategy()) {
        let crop = CropOptions::new(x, y, cw, ch);
        let source = Size::new(img_w, img_h);
        prop_assert!(plan_crop(&crop, source, CropPolicy::Strict).is_err());

        let clamped = plan_crop(&crop, source, CropPolicy::Clamp).unwrap();
        prop_assert!(clamped.fits_within(source));
        prop_assert_eq!((clamped.x, clamped.y), (x, y));

        let verbatim = plan_crop(&crop, source, CropPolicy::Verbatim).unwrap();
        prop_assert_eq!(verbatim.width, cw);
    }

    #[test]
    fn quantized_channels_land_on_bucket_or_cap(value in any::<u8>(), bucket in 2u8..=64) {
        let q = quantize_channel(value, bucket);
        prop_assert!(q == 255 || q % bucket == 0);
        prop_assert!((q as i32 - value as i32).abs() <= bucket as i32 / 2 + 1);
    }

    #[test]
    fn left_anchors_respect_padding(text_w in 0u32..=400, font in 1u32..=96, padding in 0u32..=50) {
        let canvas = Size::new(1000, 800);
        for position in [WatermarkPosition::TopLeft, WatermarkPosition::BottomLeft] {
            let (x, _) = watermark_anchor(text_w as f64, font as f64, canvas, position, padding as f64);
            prop_assert_eq!(x, padding as f64);
        }
        for position in [WatermarkPosition::TopRight, WatermarkPosition::BottomRight] {
            let (x, _) = watermark_anchor(text_w as f64, font as f64, canvas, position, padding as f64);
            prop_assert_eq!(x + text_w as f64 + padding as f64, 1000.0);
        }
    }
}

#[test]
fn five_image_collage_scenario() {
    let grid = GridLayout::plan(5, Size::new(800, 600), 10).unwrap();
    assert_eq!((grid.cols, grid.rows), (3, 2));
    assert!((grid.cell_width - 760.0 / 3.0).abs() < 1e-9);
}
