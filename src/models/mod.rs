pub mod appointment;
pub mod auth;
pub mod course_file;
pub mod request;
