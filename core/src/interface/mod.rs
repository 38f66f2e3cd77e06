pub mod estimate;
pub mod record;

pub use estimate::Estimate;
pub use record::EstimateRecord;
