//! Task scheduling strategies.

pub mod space_shared;
pub mod time_shared;
