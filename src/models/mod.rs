mod analysis;
mod frame;

pub use analysis::{AnalysisOutcome, AnalysisRecord, Direction};
pub use frame::{Frame, FrameError};
