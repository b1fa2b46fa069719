//! Source adapters: fetch raw statute payloads with provenance.

pub mod adapter;
pub mod error;
#[cfg(feature = "http")]
pub mod family;
pub mod file;
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub mod law_api;
pub mod registry;

pub use adapter::{SourceAdapter, SourceKind, SourceSpec};
pub use error::{FetchError, SourceError};
#[cfg(feature = "http")]
pub use family::{discover, plan_queries, FamilyMember, FamilyRole};
pub use file::{ArchiveSource, FileSource};
#[cfg(feature = "http")]
pub use http::{build_client, HttpSource};
#[cfg(feature = "http")]
pub use law_api::{LawApiClient, LawSearch, LawSummary};
pub use registry::SourceRegistry;
