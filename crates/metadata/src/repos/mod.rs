//! Repository traits for metadata operations.

pub mod artifacts;
pub mod reports;

pub use artifacts::ArtifactRepo;
pub use reports::ReportRepo;
