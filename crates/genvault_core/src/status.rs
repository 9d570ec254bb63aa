//! Generation lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle of a generation.
///
/// `pending` → `processing` → `completed` | `failed`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// Row created, version reserved
    #[display("pending")]
    Pending,
    /// Files are being written
    #[display("processing")]
    Processing,
    /// Manifest (and diff, if any) persisted
    #[display("completed")]
    Completed,
    /// Unrecoverable write or ledger error
    #[display("failed")]
    Failed,
}

impl GenerationStatus {
    /// Convert to string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }
}

impl std::str::FromStr for GenerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GenerationStatus::Pending),
            "processing" => Ok(GenerationStatus::Processing),
            "completed" => Ok(GenerationStatus::Completed),
            "failed" => Ok(GenerationStatus::Failed),
            _ => Err(format!("Unknown generation status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn string_form_round_trips() {
        for status in GenerationStatus::iter() {
            let parsed: GenerationStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
            assert_eq!(status.to_string(), status.as_str());
        }
    }
}
