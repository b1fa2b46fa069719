//! Dedup & merge engine and corpus assembler: merged statute records,
//! the canonical JSON corpus, its Markdown projection and zip bundles.

pub mod bundle;
pub mod corpus;
mod error;
pub mod markdown;
pub mod merge;
pub mod publish;

pub use bundle::{export_bundle, safe_file_name, write_bundle};
pub use corpus::{CorpusArtifact, Manifest, UpdateStats};
pub use error::StoreError;
pub use merge::{Candidate, MergeEngine, MergeRecord, TrustPolicy};
