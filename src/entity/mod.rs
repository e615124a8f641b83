//! SeaORM entities for licenses, bound devices and the activation trail.

pub mod activation_log;
pub mod device;
pub mod license;

pub use license::LicenseType;
