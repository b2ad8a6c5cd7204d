// tests/common/mod.rs
pub use axum::Router;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use serde_json::json;

use crate::config::environment::Endpoints;
use crate::config::settings::{ClientSettings, Credentials};
use crate::sinks::trace_sink::{TraceEntry, TraceKind, TraceSink};

pub const CLIENT_ID: &str = "eyJpZCI6IjgwNDNiNTMtZjQ5Mi00YyIsImNvZGlnb1B1YmxpY2Fkb3IiOjEwOX0";
pub const CLIENT_SECRET: &str = "eyJpZCI6IjBjZDFlMGQtN2UyNC00MGQyLWI0YSIsImNvZGlnb1B1YmxpY2Fkb3IiOjEwOX0";

pub const REGISTERED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <ns0:resposta xmlns:ns0="http://www.tibco.com/schemas/bws_registro_cbr/Recursos/XSD/Schema.xsd">
      <ns0:codigoRetornoPrograma>0</ns0:codigoRetornoPrograma>
      <ns0:textoMensagemErro/>
      <ns0:textoNumeroTituloCobrancaBb>00010140510000000123</ns0:textoNumeroTituloCobrancaBb>
      <ns0:linhaDigitavel>00190000090101405100500000123179875380000010000</ns0:linhaDigitavel>
    </ns0:resposta>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

/// Non-zero code without a business message, as answered for an expired token.
pub const STALE_TOKEN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <SOAP-ENV:Fault>
      <faultcode>SOAP-ENV:Server</faultcode>
      <faultstring>Token expirado</faultstring>
      <detail><erro><codigo>401</codigo><mensagem>Token invalido ou expirado</mensagem></erro></detail>
    </SOAP-ENV:Fault>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

pub const DUPLICATE_TITLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <ns0:resposta xmlns:ns0="http://www.tibco.com/schemas/bws_registro_cbr/Recursos/XSD/Schema.xsd">
      <ns0:codigoRetornoPrograma>5</ns0:codigoRetornoPrograma>
      <ns0:textoMensagemErro>Titulo ja incluido anteriormente</ns0:textoMensagemErro>
    </ns0:resposta>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// What the fake webservice saw.
#[derive(Clone, Default)]
pub struct Recorded {
    pub token_calls: Arc<AtomicUsize>,
    pub registration_calls: Arc<AtomicUsize>,
    pub token_requests: Arc<Mutex<Vec<(String, String)>>>,
    pub bearer_tokens: Arc<Mutex<Vec<String>>>,
    pub registration_headers: Arc<Mutex<Vec<HeaderMap>>>,
    pub envelopes: Arc<Mutex<Vec<String>>>,
}

impl Recorded {
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn registration_calls(&self) -> usize {
        self.registration_calls.load(Ordering::SeqCst)
    }

    pub fn bearer_tokens(&self) -> Vec<String> {
        self.bearer_tokens.lock().unwrap().clone()
    }
}

#[derive(Clone)]
struct WebserviceState {
    recorded: Recorded,
    /// Reply per registration call; the last one repeats.
    replies: Arc<Vec<String>>,
}

/// Fake token + registration endpoints. Tokens are `fresh-token-<n>`.
pub struct FakeWebservice {
    pub addr: SocketAddr,
    pub recorded: Recorded,
    handle: JoinHandle<()>,
}

impl FakeWebservice {
    pub async fn start(replies: &[&str]) -> Self {
        let recorded = Recorded::default();
        let state = WebserviceState {
            recorded: recorded.clone(),
            replies: Arc::new(replies.iter().map(|r| r.to_string()).collect()),
        };
        let router = Router::new()
            .route("/oauth/token", post(token_handler))
            .route("/registrarBoleto", post(registration_handler))
            .with_state(state);
        let (handle, addr) = spawn_axum(router).await;
        Self { addr, recorded, handle }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            token_url: format!("http://{}/oauth/token", self.addr),
            registration_url: format!("http://{}/registrarBoleto", self.addr),
        }
    }

    pub fn settings(&self, cache_dir: &Path) -> ClientSettings {
        test_settings(cache_dir).with_endpoints(self.endpoints())
    }
}

impl Drop for FakeWebservice {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn token_handler(
    State(state): State<WebserviceState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let n = state.recorded.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let authorization = header(&headers, AUTHORIZATION.as_str());
    state.recorded.token_requests.lock().unwrap().push((authorization, body));
    let body = json!({
        "access_token": format!("fresh-token-{}", n),
        "token_type": "Bearer",
        "expires_in": 1200
    });
    ([(CONTENT_TYPE, "application/json")], body.to_string())
}

async fn registration_handler(
    State(state): State<WebserviceState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let n = state.recorded.registration_calls.fetch_add(1, Ordering::SeqCst);
    let bearer = header(&headers, AUTHORIZATION.as_str());
    state
        .recorded
        .bearer_tokens
        .lock()
        .unwrap()
        .push(bearer.trim_start_matches("Bearer ").to_owned());
    state.recorded.registration_headers.lock().unwrap().push(headers);
    state.recorded.envelopes.lock().unwrap().push(body);

    let reply = state
        .replies
        .get(n)
        .or(state.replies.last())
        .cloned()
        .unwrap_or_default();
    ([(CONTENT_TYPE, "text/xml;charset=UTF-8")], reply)
}

pub fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

pub fn test_settings(cache_dir: &Path) -> ClientSettings {
    ClientSettings::new(Credentials::new(CLIENT_ID, CLIENT_SECRET))
        .with_cache_dir(cache_dir)
        .with_timeout(Duration::from_secs(5))
}

/// Keeps every traced document in memory.
#[derive(Default)]
pub struct RecordingTraceSink {
    pub entries: Mutex<Vec<(TraceKind, String, u32, String)>>,
}

impl TraceSink for RecordingTraceSink {
    fn record(&self, entry: &TraceEntry<'_>) {
        self.entries.lock().unwrap().push((
            entry.kind,
            entry.reference.to_owned(),
            entry.attempt,
            entry.xml.to_owned(),
        ));
    }
}
