pub mod contents;
pub mod counters;
pub mod legacy;
