/// Token sources
///
/// The webservice issues tokens through a single OAuth2 client credentials
/// endpoint; `authority` wraps it together with the file cache.
pub mod authority;

pub use authority::TokenAuthority;
