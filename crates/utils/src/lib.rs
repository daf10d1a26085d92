mod build_info;
pub mod logging;
pub mod time_range;
pub mod version;
