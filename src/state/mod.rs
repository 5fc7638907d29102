pub mod app;
pub mod kv;
#[cfg(feature = "redis_store")]
pub mod redis;
