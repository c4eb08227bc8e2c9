// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use kube::Client;
use log::info;

use crate::certs::{self, TrustTriple};
use crate::config::{CreateConfig, FieldNames};
use crate::error::Result;
use crate::trust_store::TrustStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

fn secret_data(triple: TrustTriple, fields: &FieldNames) -> BTreeMap<String, Vec<u8>> {
    BTreeMap::from([
        (fields.ca.clone(), triple.ca),
        (fields.cert.clone(), triple.cert),
        (fields.key.clone(), triple.key),
    ])
}

/// Make sure a CA, certificate and key exist in the configured secret.
///
/// An existing secret is left untouched, so running this repeatedly is safe.
pub async fn run(client: Client, config: &CreateConfig) -> Result<CreateOutcome> {
    let store = TrustStore::new(client, &config.secret);
    if store.load_ca(&config.fields.ca).await?.is_some() {
        info!("secret {} already exists", config.secret);
        return Ok(CreateOutcome::AlreadyExists);
    }

    info!("creating new secret {}", config.secret);
    let triple = certs::generate(&config.hosts)?;
    store.save(secret_data(triple, &config.fields)).await?;
    info!("created secret {}", config.secret);
    Ok(CreateOutcome::Created)
}
