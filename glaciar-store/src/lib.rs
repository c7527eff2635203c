pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod code_repo;
pub mod coupon_repo;
pub mod database;
pub mod order_repo;
pub mod schedule_repo;

pub use app_config::Config;
pub use booking_repo::StoreBookingRepository;
pub use catalog_repo::StoreCatalogRepository;
pub use code_repo::StoreSessionCodeRepository;
pub use coupon_repo::StoreCouponRepository;
pub use database::DbClient;
pub use order_repo::StoreOrderRepository;
pub use schedule_repo::StoreScheduleRepository;
