//! Command implementations

mod credentials;
mod helper;
mod login;
mod logout;
mod projects;

pub use credentials::credentials;
pub use login::login;
pub use logout::logout;
pub use projects::projects;
