pub mod file_formats;
pub mod method;
pub mod production;
pub mod pvt;
pub mod reservoir;
