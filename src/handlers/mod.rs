pub mod config;
pub mod convert;
pub mod info;

pub use config::*;
pub use convert::*;
pub use info::*;
