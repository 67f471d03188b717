#![no_main]

use lazy_canvas::engine::{Decoder, ImageResource, DEFAULT_DECODE_BUDGET_BYTES};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let decoder = Decoder::new(DEFAULT_DECODE_BUDGET_BYTES);
    let resource = ImageResource::new(data.to_vec(), "image/png", "fuzz.png");
    let _ = decoder.decode(&resource);
    assert_eq!(decoder.registry().active(), 0);
});
