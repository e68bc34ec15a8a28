pub mod services;
pub mod utils;
