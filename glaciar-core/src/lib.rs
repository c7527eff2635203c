pub mod booking;
pub mod coupon;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod package;
pub mod repository;
pub mod schedule;
#[cfg(feature = "testing")]
pub mod testing;
pub mod timezone;

pub use error::{BoxError, EngineError, Rejection};
