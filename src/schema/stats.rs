use serde::{Deserialize, Serialize};

/// A signed change to one named variable.
///
/// Appears on choices (`effects`), on check outcomes (`moral`), and in
/// `variables:delta` event payloads, where `delta` is the effective
/// post-clamp change rather than the requested one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatDelta {
    pub variable: String,
    pub delta: f64,
}
