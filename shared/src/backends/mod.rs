cfg_if! {
    if #[cfg(all(target_arch = "wasm32", feature = "wbindgen"))] {
        mod wasm_bindgen;
        use self::wasm_bindgen::now_since_epoch;
    } else {
        mod native;
        use self::native::now_since_epoch;
    }
}

mod instant;

pub use instant::{Clock, Instant, SystemClock};
