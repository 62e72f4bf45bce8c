pub mod grading;
pub mod history;
pub mod stats;

pub use grading::{GradedSheet, grade};
pub use history::ProgressTracker;
pub use stats::DashboardStats;
