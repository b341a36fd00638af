pub mod coverage;
pub mod geometry;
pub mod table;

pub use coverage::{coverage, Coverage, CoverageClass, JointGroup};
pub use table::{MetricId, MetricInput, MetricSpec, Signal, View, ViewRequirement, METRICS};
