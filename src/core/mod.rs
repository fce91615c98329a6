mod plan;
mod record;
mod segment;
pub(crate) mod utils;

pub use plan::WorkerPlan;
pub use record::{merge_fragments, Record};
pub use segment::ByteSegment;
