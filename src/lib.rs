pub mod logging;
pub mod models;
pub mod services;

pub use logging::init_logging;
