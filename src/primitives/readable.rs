// ============================================================================
// spark-signal-utils - Readable
// Anything whose current value can be read, tracked or not
// ============================================================================

/// A reactive value that can be read.
///
/// `read` registers a dependency inside an effect or derived; `peek` never
/// does. The wait helpers accept any `Readable`, so they work the same for
/// signals, deriveds and pending flags.
pub trait Readable<T> {
    fn read(&self) -> T;

    fn peek(&self) -> T;
}
