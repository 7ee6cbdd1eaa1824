//! SeqLab Core Library
//!
//! Pairwise alignment engine with co-optimal path enumeration, spatial
//! steric-clash detection, and typed PDB input parsing.

pub mod align;
pub mod clash;
pub mod io;
pub mod types;

// Re-export commonly used types and functions
pub use align::{align, Alignment, AlignmentMatrix, Mode, OptimalPath, Scoring};
pub use clash::{detect_clashes, ClashReport, SearchMode, UniformGrid};
pub use types::{Atom, Point, Residue, Structure};

/// Version information for the SeqLab core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
