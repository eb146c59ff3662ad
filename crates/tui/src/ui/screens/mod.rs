pub mod create;
pub mod home;
pub mod profile;
