pub mod app;
pub mod codec;
pub mod compute;
pub mod context;
pub mod database;
pub mod storage;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
