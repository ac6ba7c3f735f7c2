//! Status enums.

use serde::{Deserialize, Serialize};

/// Where a cart-bearing screen is in its load/mutate cycle.
///
/// ```text
/// Uninitialized -> Loading -> Ready
/// Ready -> Mutating -> Reconciling -> Ready
/// ```
///
/// `Ready` is both the resting state and the last state of a session; a
/// failed operation still ends in `Ready` (or `Uninitialized` if no cart was
/// ever loaded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartPhase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Mutating,
    Reconciling,
}

impl CartPhase {
    /// Lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Mutating => "mutating",
            Self::Reconciling => "reconciling",
        }
    }
}

impl std::fmt::Display for CartPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_uninitialized() {
        assert_eq!(CartPhase::default(), CartPhase::Uninitialized);
    }

    #[test]
    fn test_display() {
        assert_eq!(CartPhase::Reconciling.to_string(), "reconciling");
    }
}
