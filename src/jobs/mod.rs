//! Job status table
//!
//! Process-wide, in-memory record of every download submitted since start.
//! Records are created in `starting`, advanced only by their owning worker,
//! read by any number of status queries and never removed; a restart clears
//! everything.

mod error;
mod state;
mod table;

pub use error::{JobError, Result};
pub use state::{JobPhase, JobSnapshot, JobState};
pub use table::JobTable;
