pub mod presence;
pub mod user;
