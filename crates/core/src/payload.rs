//! Event payload model.
//!
//! Payloads are JSON objects: an ordered mapping from string key to a
//! tagged-union value (string/number/bool/object/array/null). This keeps the
//! flexibility of the wire format without giving up type safety at the edges.

use serde_json::{Map, Value};

/// A JSON-object payload.
pub type Payload = Map<String, Value>;

/// Merge `from` into `into`, later keys overriding earlier ones.
///
/// This is the last-writer-wins step of the fold: applied per event in
/// ascending timestamp order, the accumulator ends up with each key's most
/// recent value.
pub fn merge_into(into: &mut Payload, from: &Payload) {
    for (key, value) in from {
        into.insert(key.clone(), value.clone());
    }
}
