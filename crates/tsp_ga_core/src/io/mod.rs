pub mod options;
pub mod points;
pub mod report;
