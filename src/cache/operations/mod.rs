//! Cache lookup, staged acquisition, and publication.
//!
//! An entry is only ever created by renaming a fully unpacked temp directory
//! into place, so lookups never need a completion marker or a lock.

mod acquire;
mod lookup;
mod publish;

pub use acquire::{Acquisition, AcquisitionSource, ArtifactCache};
pub use lookup::{CacheLookupResult, lookup, lookup_file};
pub use publish::{PublishOutcome, publish};
