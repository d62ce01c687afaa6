pub mod lanes;
pub mod registry;

pub use lanes::LaneAllocator;
pub use registry::ChannelRegistry;
