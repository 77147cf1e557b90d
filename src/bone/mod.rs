pub mod cache;
pub mod id;
pub mod pose;
pub mod transform;

pub use cache::*;
pub use id::*;
pub use pose::*;
pub use transform::*;
