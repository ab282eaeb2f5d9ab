//! Dossier Domain Layer
//!
//! Core vocabulary shared by every Dossier crate. Like any domain layer it has
//! ZERO external dependencies and only defines value objects and the trait
//! seams that infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **Section**: a contiguous, 1-based, inclusive line range of a larger text blob
//! - **Category**: one label of the closed, schema-defined taxonomy
//! - **Chat messages**: role-tagged text/image parts sent to a language model
//! - **LlmProvider**: the backend seam used by segmentation, categorization,
//!   schema-guided extraction and image transcription
//!
//! ## Architecture
//!
//! ```text
//! dossier-domain  ←  dossier-llm  ←  dossier-extract  ←  dossier-pipeline  ←  dossier-cli
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod message;
pub mod section;
pub mod traits;

// Re-exports for convenience
pub use category::CategoryId;
pub use message::{ChatMessage, ContentPart, ResponseConstraint, Role};
pub use section::{Section, SectionError};
