pub mod bind;
pub mod catalog;
pub mod disks;
pub mod packages;
pub mod pool;
pub mod services;
