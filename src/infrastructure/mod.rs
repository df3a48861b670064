pub mod bluetooth;
pub mod keep_alive;
pub mod logging;
pub mod upload;
