//! Вспомогательные модули

pub mod logger;
pub mod temp;

pub use logger::init_logger;
pub use temp::TempFileManager;
