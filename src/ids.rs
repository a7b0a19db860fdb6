//! Unique-string id source for orders and trades.

use uuid::Uuid;

/// Pluggable source of unique string ids. The transport assigns order ids at
/// creation; the engine draws trade ids from the same source.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Default id source: random v4 UUIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
