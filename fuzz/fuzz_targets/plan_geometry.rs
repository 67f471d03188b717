#![no_main]

use arbitrary::Arbitrary;
use lazy_canvas::engine::{fit_within, plan_crop, CropPolicy, GridLayout, Size};
use lazy_canvas::ops::CropOptions;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    width: u16,
    height: u16,
    max_width: u16,
    max_height: u16,
    count: u8,
    padding: u8,
    crop: (u16, u16, u16, u16),
    policy: u8,
}

fuzz_target!(|input: Input| {
    let source = Size::new(u32::from(input.width).max(1), u32::from(input.height).max(1));

    let (max_w, max_h) = (u32::from(input.max_width).max(1), u32::from(input.max_height).max(1));
    let fitted = fit_within(source, max_w, max_h);
    assert!(fitted.width >= 1 && fitted.height >= 1);
    assert!(fitted.width <= source.width.max(max_w));

    if let Ok(grid) = GridLayout::plan(usize::from(input.count), source, u32::from(input.padding)) {
        for index in 0..usize::from(input.count) {
            let placed = grid.place(index, source);
            assert!(placed.width.is_finite() && placed.height.is_finite());
        }
    }

    let policy = match input.policy % 3 {
        0 => CropPolicy::Strict,
        1 => CropPolicy::Clamp,
        _ => CropPolicy::Verbatim,
    };
    let (x, y, w, h) = input.crop;
    let options = CropOptions::new(u32::from(x), u32::from(y), u32::from(w), u32::from(h));
    if let Ok(rect) = plan_crop(&options, source, policy) {
        assert!(rect.width > 0 && rect.height > 0);
        if policy != CropPolicy::Verbatim {
            assert!(rect.fits_within(source));
        }
    }
});
