//! Functionality shared by every command of the binary.

pub mod trace;
