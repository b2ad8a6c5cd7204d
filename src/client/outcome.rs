use crate::envelope::{ResponseMap, ResponseNode};
use crate::error::{ClientError, RegistrationFailure, Result};
use crate::utils::constants::{
    ERROR_MESSAGE_FIELD, FAULT_RESPONSE_MSG, RETURN_CODE_FIELD, UNEXPECTED_RESPONSE_MSG,
};

/// Classification of one registration attempt.
#[derive(Debug)]
pub enum Outcome {
    Registered(ResponseMap),
    /// Failure that may come from a stale token; worth one retry with a
    /// freshly issued token.
    Retryable(ClientError),
    Terminal(ClientError),
}

pub fn evaluate(decoded: Result<ResponseMap>) -> Outcome {
    match decoded {
        Err(err) => Outcome::Retryable(err),
        Ok(result) if is_registered(&result) => Outcome::Registered(result),
        // A business message means the request itself was refused.
        Ok(result) if result.contains_key(ERROR_MESSAGE_FIELD) => {
            Outcome::Terminal(ClientError::Registration(failure_from(&result)))
        }
        Ok(result) => Outcome::Retryable(ClientError::Registration(failure_from(&result))),
    }
}

/// `codigoRetornoPrograma` present and numerically zero.
pub fn is_registered(result: &ResponseMap) -> bool {
    result
        .get_text(RETURN_CODE_FIELD)
        .and_then(|code| code.trim().parse::<i64>().ok())
        == Some(0)
}

/// Provider error detail: `detail.erro` items, else `textoMensagemErro`,
/// else a generic message.
pub fn failure_from(result: &ResponseMap) -> RegistrationFailure {
    if let Some(detail) = result.get("detail").and_then(ResponseNode::as_map) {
        let details: Vec<String> = detail
            .get_all("erro")
            .flat_map(ResponseNode::texts)
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
            .collect();
        if detail.contains_key("erro") {
            return RegistrationFailure { message: FAULT_RESPONSE_MSG.to_owned(), details };
        }
    }

    let message = result
        .get_text(ERROR_MESSAGE_FIELD)
        .filter(|text| !text.is_empty())
        .unwrap_or(UNEXPECTED_RESPONSE_MSG);
    RegistrationFailure { message: message.to_owned(), details: Vec::new() }
}
