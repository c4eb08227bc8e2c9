// SPDX-License-Identifier: MIT

//! Persistence of the CA, serving certificate and key in a Secret.

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ObjectMeta, PostParams};
use kube::{Api, Client};
use log::{debug, info};

use crate::config::SecretRef;
use crate::error::{Error, Result};

const KIND: &str = "Secret";

pub struct TrustStore {
    api: Api<Secret>,
    secret: SecretRef,
}

impl TrustStore {
    pub fn new(client: Client, secret: &SecretRef) -> Self {
        Self {
            api: Api::namespaced(client, &secret.namespace),
            secret: secret.clone(),
        }
    }

    /// Read the CA bundle stored under `field`.
    ///
    /// Returns `None` if the secret does not exist. A secret without `field`
    /// is an error: something other than this tool created it.
    pub async fn load_ca(&self, field: &str) -> Result<Option<Vec<u8>>> {
        debug!("getting secret {}", self.secret);
        let secret = match self.api.get(&self.secret.name).await {
            Ok(secret) => secret,
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                info!("secret {} does not exist", self.secret);
                return Ok(None);
            }
            Err(e) => return Err(Error::kube("get", KIND, &self.secret.to_string(), e)),
        };

        match secret.data.and_then(|mut data| data.remove(field)) {
            Some(ByteString(ca)) => {
                debug!("got secret");
                Ok(Some(ca))
            }
            None => Err(Error::MissingField {
                namespace: self.secret.namespace.clone(),
                name: self.secret.name.clone(),
                field: field.to_string(),
            }),
        }
    }

    /// Create the secret with `fields`. Never overwrites an existing secret.
    pub async fn save(&self, fields: BTreeMap<String, Vec<u8>>) -> Result<()> {
        debug!("saving to secret {}", self.secret);
        let data = fields
            .into_iter()
            .map(|(name, value)| (name, ByteString(value)))
            .collect();
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(self.secret.name.clone()),
                namespace: Some(self.secret.namespace.clone()),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        };

        self.api
            .create(&PostParams::default(), &secret)
            .await
            .map_err(|e| Error::kube("create", KIND, &self.secret.to_string(), e))?;
        debug!("saved secret");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_client::{MockClient, assert_kube_api_error, echo, to_json};
    use http::{Method, StatusCode};

    const SECRET: &str = "/api/v1/namespaces/certs/secrets/webhook-tls";
    const SECRETS: &str = "/api/v1/namespaces/certs/secrets";

    fn secret_ref() -> SecretRef {
        SecretRef {
            namespace: "certs".to_string(),
            name: "webhook-tls".to_string(),
        }
    }

    fn stored(fields: &[(&str, &str)]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("webhook-tls".to_string()),
                namespace: Some("certs".to_string()),
                ..Default::default()
            },
            data: Some(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_ca_absent_secret() {
        let (client, _) = MockClient::new(|_| Err(StatusCode::NOT_FOUND), "certs").into_client();
        let store = TrustStore::new(client, &secret_ref());
        assert_eq!(store.load_ca("ca").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_ca_present() {
        let secret = stored(&[("ca.crt", "ca-bytes"), ("cert", "cert-bytes")]);
        let (client, _) = MockClient::new(
            move |req| match req {
                r if r.is(Method::GET, SECRET) => to_json(&secret),
                _ => Err(StatusCode::NOT_FOUND),
            },
            "certs",
        )
        .into_client();
        let store = TrustStore::new(client, &secret_ref());
        assert_eq!(
            store.load_ca("ca.crt").await.unwrap(),
            Some(b"ca-bytes".to_vec())
        );
    }

    #[tokio::test]
    async fn test_load_ca_missing_field() {
        let secret = stored(&[("cert", "cert-bytes")]);
        let (client, _) = MockClient::new(move |_| to_json(&secret), "certs").into_client();
        let store = TrustStore::new(client, &secret_ref());
        let err = store.load_ca("ca").await.unwrap_err();
        assert!(matches!(err, Error::MissingField { ref field, .. } if field == "ca"));
        assert_eq!(
            err.to_string(),
            "secret certs/webhook-tls does not contain 'ca' key"
        );
    }

    #[tokio::test]
    async fn test_load_ca_api_failure() {
        let (client, _) =
            MockClient::new(|_| Err(StatusCode::INTERNAL_SERVER_ERROR), "certs").into_client();
        let store = TrustStore::new(client, &secret_ref());
        let err = store.load_ca("ca").await.unwrap_err();
        assert!(matches!(err, Error::Api { verb: "get", .. }));
        assert_kube_api_error!(err, 500);
    }

    #[tokio::test]
    async fn test_save_creates_secret() {
        let (client, recorder) = MockClient::new(
            |req| match req {
                r if r.is(Method::POST, SECRETS) => echo(r),
                _ => Err(StatusCode::NOT_FOUND),
            },
            "certs",
        )
        .into_client();
        let store = TrustStore::new(client, &secret_ref());
        let fields = BTreeMap::from([
            ("ca".to_string(), b"ca".to_vec()),
            ("cert".to_string(), b"cert".to_vec()),
            ("key".to_string(), b"key".to_vec()),
        ]);
        store.save(fields).await.unwrap();

        let writes = recorder.writes();
        assert_eq!(writes.len(), 1);
        let created: Secret = writes[0].json();
        assert_eq!(created.metadata.name.as_deref(), Some("webhook-tls"));
        assert_eq!(
            created.data,
            stored(&[("ca", "ca"), ("cert", "cert"), ("key", "key")]).data
        );
    }

    #[tokio::test]
    async fn test_save_never_overwrites() {
        let (client, recorder) =
            MockClient::new(|_| Err(StatusCode::CONFLICT), "certs").into_client();
        let store = TrustStore::new(client, &secret_ref());
        let err = store.save(BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert_kube_api_error!(err, 409);
        assert!(
            recorder
                .requests()
                .iter()
                .all(|r| r.method == Method::POST)
        );
    }
}
