pub mod endpoint;
pub mod status;

pub use endpoint::*;
pub use status::*;
