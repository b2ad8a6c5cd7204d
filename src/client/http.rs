use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::warn;

use crate::config::settings::ClientSettings;
use crate::error::Result;

/// Builds the HTTP client shared by the token and registration calls.
pub fn build_http_client(settings: &ClientSettings) -> Result<Client> {
    if settings.http.accept_invalid_certs {
        warn!("TLS certificate verification is disabled for the webservice client");
    }
    let client = Client::builder()
        .timeout(settings.timeout())
        .redirect(Policy::limited(settings.http.max_redirects))
        .danger_accept_invalid_certs(settings.http.accept_invalid_certs)
        .build()?;
    Ok(client)
}
