use std::time::Duration;

pub(crate) fn now_since_epoch() -> Duration {
    let millis = js_sys::Date::now();
    if millis.is_sign_negative() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(millis / 1000.0)
}
