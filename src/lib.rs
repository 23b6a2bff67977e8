pub mod core;
pub mod daemon;
pub mod http;
pub mod relay;
pub mod util;
