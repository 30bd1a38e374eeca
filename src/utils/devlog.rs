//! Developer benchmark lines with a thread-local sink for deterministic tests.
//!
//! Every line is also forwarded to the `log` facade under the
//! `memquery::dev6` target at TRACE.

use std::cell::RefCell;
use std::time::Instant;

/// Log target used for developer benchmark lines.
pub const DEV_TARGET: &str = "memquery::dev6";

thread_local! {
    static TL_SINK: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Guard that disables the thread-local sink on drop.
pub struct DevSinkGuard;
impl Drop for DevSinkGuard {
    fn drop(&mut self) {
        TL_SINK.with(|s| *s.borrow_mut() = None);
    }
}

/// Enable the thread-local sink for the current thread until the guard drops.
pub fn enable_thread_sink() -> DevSinkGuard {
    TL_SINK.with(|s| *s.borrow_mut() = Some(Vec::new()));
    DevSinkGuard
}

pub fn write_str(msg: &str) {
    TL_SINK.with(|s| {
        if let Some(buf) = s.borrow_mut().as_mut() {
            buf.push(msg.to_owned());
        }
    });
}

/// Drain the captured lines for the current thread.
pub fn drain() -> Vec<String> {
    TL_SINK.with(|s| s.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

/// Emit one JSON benchmark line for an engine operation.
pub fn bench(op: &str, started: Instant, scanned: usize, matched: usize) {
    let line = serde_json::json!({
        "bench": "query",
        "op": op,
        "duration_us": u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        "scanned": scanned,
        "matched": matched,
    });
    crate::dev6!("{}", line);
}

/// Emit a developer log line and capture it in the thread-local sink if enabled.
#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        $crate::utils::devlog::write_str(&__s);
        log::log!(target: $crate::utils::devlog::DEV_TARGET, log::Level::Trace, "{}", __s);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_local_sink_captures_messages() {
        let _g = enable_thread_sink();
        crate::dev6!("alpha {}", 1);
        bench("find", Instant::now(), 3, 1);
        let lines = drain();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "alpha 1");
        let v: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(v["op"], "find");
        assert_eq!(v["matched"], 1);
        assert!(drain().is_empty());
    }

    #[test]
    fn isolation_between_threads() {
        let _g = enable_thread_sink();
        crate::dev6!("main-thread");
        let handle = std::thread::spawn(|| {
            crate::dev6!("child-thread");
            drain()
        });
        assert!(handle.join().unwrap().is_empty());
        assert_eq!(drain(), vec!["main-thread".to_string()]);
    }
}
