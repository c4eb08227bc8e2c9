// SPDX-License-Identifier: MIT

use kube::Client;

use crate::config::PatchConfig;
use crate::crd;
use crate::error::{Error, Result};
use crate::trust_store::TrustStore;
use crate::webhook::{self, WebhookPatch};

/// Distribute the CA stored in the configured secret to the webhook
/// configurations and CustomResourceDefinitions.
pub async fn run(client: Client, config: &PatchConfig) -> Result<()> {
    let store = TrustStore::new(client.clone(), &config.secret);
    let ca = store
        .load_ca(&config.ca_name)
        .await?
        .ok_or_else(|| Error::SecretAbsent {
            namespace: config.secret.namespace.clone(),
            name: config.secret.name.clone(),
        })?;

    let patch = WebhookPatch {
        name: &config.webhook_name,
        ca_bundle: &ca,
        failure_policy: config.failure_policy,
        validating: config.patch_validating,
        mutating: config.patch_mutating,
        version: config.version,
    };
    webhook::patch_webhook_configurations(client.clone(), &patch).await?;

    if !config.crds.is_empty() || !config.crd_api_groups.is_empty() {
        crd::patch_custom_resource_definitions(
            client,
            &config.crds,
            &config.crd_api_groups,
            &ca,
        )
        .await?;
    }

    Ok(())
}
