//! Schema-agnostic document model.
//!
//! Both CycloneDX and SPDX inputs are decoded into these structures before any
//! stage runs, and serialized back from them afterwards. Documents are only
//! mutated through methods that keep component identity unique and
//! relationship endpoints resolvable.

mod document;
mod identifiers;
mod license;
mod metadata;

pub use document::*;
pub use identifiers::*;
pub use license::*;
pub use metadata::*;
