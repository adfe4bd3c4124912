//! Construction of gap-free weekly series from the raw sales table.

mod builder;

pub use builder::SeriesBuilder;
