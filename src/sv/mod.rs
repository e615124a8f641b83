pub mod license;
pub mod logs;

pub use license::License;
pub use logs::Logs;
