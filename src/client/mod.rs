pub mod http;
pub mod outcome;
pub mod registration;

pub use registration::RegistrationClient;
