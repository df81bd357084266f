pub mod config;
pub mod init;
pub mod intent;
pub mod phase;
pub mod validate;
