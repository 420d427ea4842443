pub mod appointments;
pub mod assignment;
pub mod auth;
pub mod email;
pub mod files;
pub mod pricing;
pub mod requests;
pub mod storage;
pub mod video;
