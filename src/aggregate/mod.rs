//! Pure reductions from loaded tables to chart values.

pub mod density;
pub mod facility;
pub mod need;
pub mod other;

pub use density::{density, DensityRow};
pub use facility::{count_facilities, FacilityRecord, RegionLevel};
pub use need::{join_need, need_index, NeedRow};
pub use other::{bucket_other, Slice, DEFAULT_THRESHOLD_PCT, OTHER_LABEL};
