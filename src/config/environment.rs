use serde::Deserialize;

/// Which deployment of the webservice the client talks to.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    /// Homologation deployment used for testing.
    Sandbox,
}

/// Pair of remote endpoints used by one client.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token_url: String,
    pub registration_url: String,
}

impl Environment {
    pub fn endpoints(&self) -> Endpoints {
        match self {
            Environment::Production => Endpoints {
                token_url: "https://oauth.bb.com.br/oauth/token".to_owned(),
                registration_url: "https://cobranca.bb.com.br:7101/registrarBoleto".to_owned(),
            },
            Environment::Sandbox => Endpoints {
                token_url: "https://oauth.hm.bb.com.br/oauth/token".to_owned(),
                registration_url: "https://cobranca.homologa.bb.com.br:7101/registrarBoleto"
                    .to_owned(),
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Sandbox => "sandbox",
        }
    }
}
