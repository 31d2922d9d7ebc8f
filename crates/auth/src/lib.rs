pub mod authenticator;
pub mod constants;
pub mod profile;
pub mod status;
