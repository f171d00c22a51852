pub mod artifact;
pub mod daily;
pub mod region;

pub use region::Region;
