pub mod candidate;
pub mod duplicate;
pub mod exact;
pub mod image;
pub mod indexer;
pub mod language;
pub mod phash;
pub mod scanner;
pub mod text;
pub mod title;

/// Called with `(completed, total)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Run a caller-supplied callback; a panic inside it is logged, never propagated.
pub(crate) fn call_safely<F: FnOnce()>(what: &str, callback: F) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)) {
        log::warn!("{} callback panicked: {:?}", what, e);
    }
}
