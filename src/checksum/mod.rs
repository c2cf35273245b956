pub mod strong;
pub mod weak;

pub use strong::RunningDigest;
pub use weak::WeakChecksum;
