pub mod date;
pub mod extract;
pub mod model;
pub mod ordinal;
pub mod pattern;
pub mod warning;

pub use extract::{Extraction, StructureExtractor};
pub use model::{
    content_hash, Addendum, Format, Level, Node, ParsedText, Rank, RawPayload, SourceRef,
    StatuteDocument, TextLine, UnknownFormat,
};
pub use pattern::PatternSet;
pub use warning::StructuralWarning;
