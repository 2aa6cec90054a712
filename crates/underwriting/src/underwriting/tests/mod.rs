mod common;

mod compliance;
mod thresholds;
