//! Shared constants and invariants

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 20;
pub const DEFAULT_MAX_REDIRECTS: usize = 3;
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Lifetime of a token issued by the provider.
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 1200;
pub const DEFAULT_TOLERANCE_PERCENT: u8 = 80;

pub const CACHE_FILE_NAME: &str = "bb_token_cache.json";
pub const CACHE_RECORD_VERSION: u32 = 1;

pub const TOKEN_GRANT_TYPE: &str = "client_credentials";
pub const TOKEN_SCOPE: &str = "cobranca.registro-boletos";

pub const SOAP_ACTION: &str = "registrarBoleto";
pub const SOAP_CONTENT_TYPE: &str = "text/xml;charset=UTF-8";

/// Result field carrying the program return code; `0` means registered.
pub const RETURN_CODE_FIELD: &str = "codigoRetornoPrograma";
/// Result field carrying a business rejection message.
pub const ERROR_MESSAGE_FIELD: &str = "textoMensagemErro";
/// Field used to name trace files after the boleto they belong to.
pub const TITLE_NUMBER_FIELD: &str = "textoNumeroTituloBeneficiario";

pub const UNEXPECTED_RESPONSE_MSG: &str = "Erro inesperado na resposta do Banco do Brasil";
pub const FAULT_RESPONSE_MSG: &str = "Erro resposta do Banco do Brasil";
pub const CONNECTION_FAILED_MSG: &str = "Nao foi possivel conectar-se ao Banco do Brasil";
