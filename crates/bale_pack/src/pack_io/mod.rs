//! Reading and writing packs on disk.

pub mod common;
pub mod gathering;
pub mod reading;
pub mod writing;
