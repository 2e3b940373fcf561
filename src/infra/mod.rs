pub mod codec;
pub mod db;
pub mod store;
pub mod uploads;
