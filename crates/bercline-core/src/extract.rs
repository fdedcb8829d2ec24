//! Record extraction interface.

/// Turns one raw payload into zero or more structured records.
///
/// Implementations are pure (no I/O) and deterministic for a given
/// payload. Unparseable fragments are skipped with a debug log, never
/// aborting the rest of the payload.
pub trait Extractor {
    type Payload;
    type Record;

    fn extract(&self, payload: &Self::Payload) -> Vec<Self::Record>;
}
