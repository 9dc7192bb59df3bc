//! Dashboard panels.

pub mod feed;
pub mod records;
