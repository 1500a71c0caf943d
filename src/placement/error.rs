//! Error types for the placement engine

use thiserror::Error;

/// Errors that can occur while placing new items
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    /// No candidate point admits the item without a collision
    #[error("could not find placement for item '{name}' ({ident})")]
    NoValidPoint { name: String, ident: String },
}

impl PlacementError {
    pub fn no_valid_point(name: impl Into<String>, ident: impl Into<String>) -> Self {
        Self::NoValidPoint {
            name: name.into(),
            ident: ident.into(),
        }
    }

    /// Name of the item that could not be placed
    pub fn item(&self) -> &str {
        match self {
            Self::NoValidPoint { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_valid_point_display() {
        let err = PlacementError::no_valid_point("Power.R1", "af22c38c");
        assert!(err.to_string().contains("Power.R1"));
        assert_eq!(err.item(), "Power.R1");
    }
}
