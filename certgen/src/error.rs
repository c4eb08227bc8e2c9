// SPDX-License-Identifier: MIT

use openssl::error::ErrorStack;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to generate {what}")]
    Generation {
        what: &'static str,
        #[source]
        source: ErrorStack,
    },

    #[error("failed to encode {what}")]
    Encoding {
        what: &'static str,
        #[source]
        source: ErrorStack,
    },

    #[error("secret {namespace}/{name} does not contain '{field}' key")]
    MissingField {
        namespace: String,
        name: String,
        field: String,
    },

    #[error("no secret with '{name}' in '{namespace}'")]
    SecretAbsent { namespace: String, name: String },

    #[error("{kind} {name} already exists or was modified concurrently")]
    Conflict {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("{kind} {name} not found")]
    NotFound {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to {verb} {kind} {name}")]
    Api {
        verb: &'static str,
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Classify a failed API call on the object `kind` `name`.
    ///
    /// `name` is namespace-qualified for namespaced objects.
    pub fn kube(verb: &'static str, kind: &str, name: &str, source: kube::Error) -> Self {
        let (kind, name) = (kind.to_string(), name.to_string());
        let code = match &source {
            kube::Error::Api(ae) => Some(ae.code),
            _ => None,
        };
        match code {
            Some(404) => Self::NotFound { kind, name, source },
            Some(409) => Self::Conflict { kind, name, source },
            _ => Self::Api {
                verb,
                kind,
                name,
                source,
            },
        }
    }

    pub fn generation(what: &'static str) -> impl FnOnce(ErrorStack) -> Self {
        move |source| Self::Generation { what, source }
    }

    pub fn encoding(what: &'static str) -> impl FnOnce(ErrorStack) -> Self {
        move |source| Self::Encoding { what, source }
    }
}
