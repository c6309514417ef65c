pub mod deploy;
pub mod remove;
pub mod status;
pub mod validate;
