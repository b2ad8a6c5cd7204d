use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::cache::token::Token;
use crate::cache::token_cache::TokenCache;
use crate::client::http::build_http_client;
use crate::client::outcome::{evaluate, Outcome};
use crate::config::environment::Environment;
use crate::config::settings::ClientSettings;
use crate::envelope::{decode, encode, RegistrationRequest, ResponseMap};
use crate::error::{ClientError, Result};
use crate::observability::metrics::{Metrics, RESULT_REGISTERED};
use crate::sinks::trace_sink::{trace_reference, FileTraceSink, TraceEntry, TraceKind, TraceSink};
use crate::sources::authority::TokenAuthority;
use crate::utils::constants::{CONNECTION_FAILED_MSG, SOAP_ACTION, SOAP_CONTENT_TYPE};

/// Registers boletos with the webservice.
///
/// Owns the credentials, the environment and every collaborator built from
/// them. A registration makes at most two attempts: the first with a cached
/// (or caller supplied) token, the second with a token renewed on purpose.
pub struct RegistrationClient {
    settings: ClientSettings,
    http: Client,
    registration_url: String,
    authority: TokenAuthority,
    trace: Option<Arc<dyn TraceSink>>,
    metrics: Arc<Metrics>,
    last_error: Mutex<Option<String>>,
}

impl RegistrationClient {
    /// Validates `settings` and builds the client. Fails with
    /// [`ClientError::MissingCredentials`] when the client id or secret is empty.
    pub fn new(settings: ClientSettings) -> Result<Self> {
        settings.validate()?;
        let metrics = Arc::new(Metrics::new()?);
        let http = build_http_client(&settings)?;
        let endpoints = settings.endpoints();
        let cache = TokenCache::from_settings(&settings, metrics.clone());
        let authority = TokenAuthority::new(
            http.clone(),
            endpoints.token_url,
            settings.credentials.clone(),
            cache,
            metrics.clone(),
        );
        let trace = settings
            .trace
            .as_ref()
            .map(|trace| Arc::new(FileTraceSink::new(trace.dir.clone())) as Arc<dyn TraceSink>);

        info!(
            "webservice client ready, environment '{}', registration endpoint '{}'",
            settings.environment.as_str(),
            endpoints.registration_url
        );
        Ok(Self {
            settings,
            http,
            registration_url: endpoints.registration_url,
            authority,
            trace,
            metrics,
            last_error: Mutex::new(None),
        })
    }

    /// Replaces the trace sink (or installs one when none is configured).
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Switches environment. Drops any explicit endpoint override so the
    /// environment's endpoints are used from now on.
    pub fn set_environment(&mut self, environment: Environment) -> Result<()> {
        self.settings.environment = environment;
        self.settings.endpoints = None;
        self.rebuild()
    }

    pub fn set_cache_dir(&mut self, dir: impl Into<PathBuf>) -> Result<()> {
        self.settings.cache.dir = dir.into();
        self.rebuild()
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        let settings = self.settings.clone().with_timeout(timeout);
        settings.validate()?;
        self.settings = settings;
        self.rebuild()
    }

    fn rebuild(&mut self) -> Result<()> {
        let http = build_http_client(&self.settings)?;
        let endpoints = self.settings.endpoints();
        let cache = TokenCache::from_settings(&self.settings, self.metrics.clone());
        self.authority = TokenAuthority::new(
            http.clone(),
            endpoints.token_url,
            self.settings.credentials.clone(),
            cache,
            self.metrics.clone(),
        );
        self.http = http;
        self.registration_url = endpoints.registration_url;
        Ok(())
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn environment(&self) -> Environment {
        self.settings.environment
    }

    pub fn registration_url(&self) -> &str {
        &self.registration_url
    }

    pub fn token_cache(&self) -> &TokenCache {
        self.authority.cache()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Message of the failure of the last call, if it failed.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn has_error(&self) -> bool {
        self.last_error().is_some()
    }

    /// Token for direct use, e.g. to pass to several [`Self::register`] calls.
    pub async fn obtain_token(&self, force_refresh: bool) -> Result<Token> {
        self.set_last_error(None);
        self.authority.obtain(force_refresh).await.inspect_err(|err| {
            error!("token acquisition failed: {}", err);
            self.set_last_error(Some(err.to_string()));
        })
    }

    /// Registers one boleto.
    ///
    /// With `token` the first attempt uses it as is; otherwise the token comes
    /// from the cache or the token endpoint. Returns the flattened response
    /// on `codigoRetornoPrograma == 0`.
    pub async fn register(
        &self,
        request: &RegistrationRequest,
        token: Option<&str>,
    ) -> Result<ResponseMap> {
        self.set_last_error(None);
        let start = Instant::now();

        let result = self.run_registration(request, token).await;

        self.metrics.registration_duration.observe(start.elapsed().as_secs_f64());
        match &result {
            Ok(_) => {
                self.metrics.registration_results.with_label_values(&[RESULT_REGISTERED]).inc();
                info!("boleto registered in {:?}", start.elapsed());
            }
            Err(err) => {
                self.metrics.registration_results.with_label_values(&[err.reason()]).inc();
                error!("boleto registration failed: {}", err);
                self.set_last_error(Some(err.to_string()));
            }
        }
        result
    }

    async fn run_registration(
        &self,
        request: &RegistrationRequest,
        supplied_token: Option<&str>,
    ) -> Result<ResponseMap> {
        let envelope = encode(request)?;
        let reference = trace_reference(request);
        let supplied_token = supplied_token.filter(|token| !token.is_empty());

        let mut forced = false;
        let mut attempt: u32 = 1;
        loop {
            let token = match supplied_token {
                Some(token) if attempt == 1 => token.to_owned(),
                _ => {
                    let token = self
                        .authority
                        .obtain(forced)
                        .await
                        .map_err(|err| ClientError::TokenAcquisition(Box::new(err)))?;
                    // a token fresh from the endpoint is never renewed again
                    if !token.from_cache {
                        forced = true;
                    }
                    token.value
                }
            };

            let body = self.send(&envelope, &token, &reference, attempt).await?;

            match evaluate(decode(&body)) {
                Outcome::Registered(result) => return Ok(result),
                Outcome::Retryable(err) if !forced => {
                    warn!("attempt {} failed ({}), retrying with a renewed token", attempt, err);
                    forced = true;
                    attempt += 1;
                }
                Outcome::Retryable(err) | Outcome::Terminal(err) => return Err(err),
            }
        }
    }

    async fn send(&self, envelope: &str, token: &str, reference: &str, attempt: u32) -> Result<String> {
        self.trace(TraceKind::Request, reference, attempt, envelope);
        self.metrics.registration_attempts.inc();
        debug!("sending registration attempt {} to '{}'", attempt, self.registration_url);

        let response = self
            .http
            .post(&self.registration_url)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header("SOAPAction", SOAP_ACTION)
            .body(envelope.to_owned())
            .send()
            .await
            .map_err(|err| ClientError::Connection(format!("{}: {}", CONNECTION_FAILED_MSG, err)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ClientError::Connection(format!("{}: {}", CONNECTION_FAILED_MSG, err)))?;
        if body.trim().is_empty() {
            return Err(ClientError::Connection(format!(
                "{}: empty response (status {})",
                CONNECTION_FAILED_MSG, status
            )));
        }
        debug!("registration endpoint answered with status {}", status);
        self.trace(TraceKind::Response, reference, attempt, &body);
        Ok(body)
    }

    fn trace(&self, kind: TraceKind, reference: &str, attempt: u32, xml: &str) {
        if let Some(sink) = &self.trace {
            sink.record(&TraceEntry { kind, reference, attempt, xml });
        }
    }

    fn set_last_error(&self, message: Option<String>) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = message;
        }
    }
}
