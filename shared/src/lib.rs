pub mod genes;
pub mod protocol;

pub use genes::*;
pub use protocol::*;

/// Version of the snapshot format served to front-ends.
pub const VIEW_FORMAT_VERSION: u32 = 1;
