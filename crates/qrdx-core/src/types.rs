use serde::{Deserialize, Serialize};

/// Position of one multi-part envelope within its set.
///
/// `part_number` is 1-based and never exceeds `total_parts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartInfo {
    pub part_number: u32,
    pub total_parts: u32,
}

impl std::fmt::Display for PartInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.part_number, self.total_parts)
    }
}
