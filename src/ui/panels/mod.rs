//! Window panels

pub mod status;
