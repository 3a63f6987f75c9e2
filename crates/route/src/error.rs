use thiserror::Error;

/// Fatal problems found while compiling a route tree.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("route '{method} {path}' has no handler reference")]
    MissingHandler { path: String, method: String },

    #[error("invalid http method '{method}' declared at '{path}'")]
    InvalidMethod { path: String, method: String },

    #[error("invalid path template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid pattern for token '{token}': {source}")]
    InvalidToken {
        token: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid route config: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub fn missing_handler<P: ToString, M: ToString>(path: P, method: M) -> Self {
        Self::MissingHandler { path: path.to_string(), method: method.to_string() }
    }

    pub fn invalid_method<P: ToString, M: ToString>(path: P, method: M) -> Self {
        Self::InvalidMethod { path: path.to_string(), method: method.to_string() }
    }

    pub fn invalid_template<T: ToString, R: ToString>(template: T, reason: R) -> Self {
        Self::InvalidTemplate { template: template.to_string(), reason: reason.to_string() }
    }

    pub fn invalid_token<T: ToString>(token: T, source: regex::Error) -> Self {
        Self::InvalidToken { token: token.to_string(), source }
    }
}

/// Failures while generating a url from a named route.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlError {
    #[error("no route named '{0}'")]
    UnknownRoute(String),

    #[error("route '{route}' requires parameter '{param}'")]
    MissingParam { route: String, param: String },

    #[error("value '{value}' of parameter '{param}' does not match its pattern")]
    InvalidParam { param: String, value: String },
}
