pub mod codes;
pub mod coupons;
pub mod engine;
pub mod packages;
pub mod slots;

pub use engine::{BookingEngine, BookingOutcome, CheckoutUrls, CreateBookingRequest};
pub use packages::{PackageService, PurchaseOutcome, PurchasePackageRequest};
