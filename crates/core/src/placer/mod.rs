//! Placer module for moving finished episodes to their final destinations.
//!
//! Covers the three filesystem actions of the episode lifecycle:
//!
//! - rendering the per-show destination template for an episode
//! - placing the primary file (atomic move with copy fallback, or copy while
//!   the transfer still needs to seed)
//! - removing the files and directories a finished transfer left behind

mod error;
mod fs_placer;
mod template;

pub use error::{PlacerError, TemplateError};
pub use fs_placer::{CleanupSummary, FsPlacer, PlacedFile, PlacementMode};
pub use template::{DestinationTemplate, EpisodeFields};
pub(crate) use template::extension_of;
