//! Tracing and logging (shared setup).

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::Format;

/// Initialize process-wide logging with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(Format::Json);
}

/// Initialize process-wide logging with an explicit output format.
pub fn init_with(format: Format) {
    tracing::init(format);
}
