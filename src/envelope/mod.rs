pub mod codec;
pub mod request;
pub mod response;

pub use codec::{decode, encode};
pub use request::RegistrationRequest;
pub use response::{ResponseMap, ResponseNode};
