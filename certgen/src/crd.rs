// SPDX-License-Identifier: MIT

//! Conversion webhook trust bundles on CustomResourceDefinitions.

use k8s_openapi::ByteString;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client, ResourceExt};
use log::{info, warn};
use thiserror::Error;

use crate::error::{Error, Result};

const KIND: &str = "CustomResourceDefinition";

/// Why a definition has nowhere to put a conversion webhook trust bundle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("spec.conversion is not defined")]
    NoConversion,
    #[error("spec.conversion.webhook is not defined")]
    NoWebhook,
    #[error("spec.conversion.webhook.clientConfig is not defined")]
    NoClientConfig,
}

pub fn set_ca_bundle(
    crd: &mut CustomResourceDefinition,
    ca_bundle: &[u8],
) -> Result<(), ConversionError> {
    let conversion = crd
        .spec
        .conversion
        .as_mut()
        .ok_or(ConversionError::NoConversion)?;
    let webhook = conversion
        .webhook
        .as_mut()
        .ok_or(ConversionError::NoWebhook)?;
    let client_config = webhook
        .client_config
        .as_mut()
        .ok_or(ConversionError::NoClientConfig)?;
    client_config.ca_bundle = Some(ByteString(ca_bundle.to_vec()));
    Ok(())
}

async fn patch_one(
    api: &Api<CustomResourceDefinition>,
    mut crd: CustomResourceDefinition,
    ca_bundle: &[u8],
) -> Result<()> {
    let name = crd.name_any();
    if let Err(e) = set_ca_bundle(&mut crd, ca_bundle) {
        warn!("skip patching CustomResourceDefinition {name}: {e}");
    }
    // Written back even when skipped: watchers rely on the update event.
    api.replace(&name, &PostParams::default(), &crd)
        .await
        .map_err(|e| Error::kube("update", KIND, &name, e))?;
    info!("patched caBundle for CustomResourceDefinition {name}");
    Ok(())
}

pub async fn patch_by_name(client: Client, names: &[String], ca_bundle: &[u8]) -> Result<()> {
    info!(
        "patching CustomResourceDefinition objects '{}'",
        names.join(",")
    );
    let api: Api<CustomResourceDefinition> = Api::all(client);
    for name in names {
        let crd = api
            .get(name)
            .await
            .map_err(|e| Error::kube("get", KIND, name, e))?;
        patch_one(&api, crd, ca_bundle).await?;
    }
    Ok(())
}

pub async fn patch_by_api_group(
    client: Client,
    groups: &[String],
    ca_bundle: &[u8],
) -> Result<()> {
    info!(
        "patching CustomResourceDefinition objects from API Groups '{}'",
        groups.join(",")
    );
    let api: Api<CustomResourceDefinition> = Api::all(client);
    let list = api
        .list(&ListParams::default())
        .await
        .map_err(|e| Error::kube("list", KIND, "objects", e))?;
    for crd in list
        .items
        .into_iter()
        .filter(|crd| groups.contains(&crd.spec.group))
    {
        patch_one(&api, crd, ca_bundle).await?;
    }
    Ok(())
}

/// Patch the definitions named in `names`, then every definition whose API
/// group is in `groups`. Either list may be empty.
pub async fn patch_custom_resource_definitions(
    client: Client,
    names: &[String],
    groups: &[String],
    ca_bundle: &[u8],
) -> Result<()> {
    if !names.is_empty() {
        patch_by_name(client.clone(), names, ca_bundle).await?;
    }
    if !groups.is_empty() {
        patch_by_api_group(client, groups, ca_bundle).await?;
    }
    info!("successfully patched CRD(s)");
    Ok(())
}
