//! Derived metrics and chart data for Korean disability-welfare statistics.
//!
//! Raw two-header CSV extracts are normalised into `<period>_<metric>` tables,
//! persisted as Parquet, and reduced to chart-ready series.

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod loader;
pub mod population;
pub mod preprocess;
pub mod region;
pub mod resolve;
pub mod table;
pub mod welfare;

pub use config::Config;
pub use loader::{DataLoader, Datasets};
pub use population::{PopulationRecord, PopulationTable};
pub use region::{normalize_region_name, RegionCatalog};
pub use resolve::ColumnResolver;
pub use table::{RawTable, Table};
pub use welfare::WelfareTable;
