// SPDX-License-Identifier: MIT

//! Trust bundle and failure policy patching for admission webhook
//! configurations.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use admission::v1beta1;
use k8s_openapi::ByteString;
use k8s_openapi::ClusterResourceScope;
use k8s_openapi::api::admissionregistration::v1;
use kube::api::PostParams;
use kube::{Api, Client, Resource};
use log::{debug, info};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    Ignore,
    Fail,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "Ignore",
            Self::Fail => "Fail",
        }
    }
}

impl Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Ignore" => Ok(Self::Ignore),
            "Fail" => Ok(Self::Fail),
            _ => Err(Error::InvalidArgument(format!(
                "patch-failure-policy {s} is not valid"
            ))),
        }
    }
}

/// `admissionregistration.k8s.io` API version of the patched configurations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdmissionRegistrationVersion {
    #[default]
    V1,
    V1Beta1,
}

impl AdmissionRegistrationVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V1Beta1 => "v1beta1",
        }
    }
}

impl Display for AdmissionRegistrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdmissionRegistrationVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "v1" => Ok(Self::V1),
            "v1beta1" => Ok(Self::V1Beta1),
            _ => Err(Error::InvalidArgument(format!(
                "invalid admissionregistration.k8s.io version: {s}"
            ))),
        }
    }
}

pub trait WebhookEntry {
    fn set_ca_bundle(&mut self, ca_bundle: &[u8]);
    fn set_failure_policy(&mut self, policy: FailurePolicy);
}

/// A webhook configuration kind in one API version.
pub trait WebhookConfiguration:
    Resource<DynamicType = (), Scope = ClusterResourceScope>
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
{
    type Entry: WebhookEntry;

    fn entries_mut(&mut self) -> &mut [Self::Entry];
}

macro_rules! webhook_entry {
    ($($entry:ty),+) => {
        $(
            impl WebhookEntry for $entry {
                fn set_ca_bundle(&mut self, ca_bundle: &[u8]) {
                    self.client_config.ca_bundle = Some(ByteString(ca_bundle.to_vec()));
                }

                fn set_failure_policy(&mut self, policy: FailurePolicy) {
                    self.failure_policy = Some(policy.to_string());
                }
            }
        )+
    };
}

macro_rules! webhook_configuration {
    ($config:ty, $entry:ty) => {
        impl WebhookConfiguration for $config {
            type Entry = $entry;

            fn entries_mut(&mut self) -> &mut [$entry] {
                self.webhooks.as_deref_mut().unwrap_or_default()
            }
        }
    };
}

webhook_entry!(v1::ValidatingWebhook, v1::MutatingWebhook, v1beta1::Webhook);
webhook_configuration!(v1::ValidatingWebhookConfiguration, v1::ValidatingWebhook);
webhook_configuration!(v1::MutatingWebhookConfiguration, v1::MutatingWebhook);
webhook_configuration!(v1beta1::ValidatingWebhookConfiguration, v1beta1::Webhook);
webhook_configuration!(v1beta1::MutatingWebhookConfiguration, v1beta1::Webhook);

/// Which webhook configurations to patch and what to write into them.
#[derive(Clone, Debug)]
pub struct WebhookPatch<'a> {
    pub name: &'a str,
    pub ca_bundle: &'a [u8],
    pub failure_policy: Option<FailurePolicy>,
    pub validating: bool,
    pub mutating: bool,
    pub version: AdmissionRegistrationVersion,
}

impl WebhookPatch<'_> {
    /// Fetch the configuration `K` named `self.name`, rewrite every webhook
    /// entry and replace the whole object. The update carries the fetched
    /// resource version, so a concurrent modification surfaces as a conflict.
    async fn apply<K: WebhookConfiguration>(&self, client: Client) -> Result<()> {
        let kind = format!("{} {}", K::api_version(&()), K::kind(&()));
        let api: Api<K> = Api::all(client);
        let mut config = api
            .get(self.name)
            .await
            .map_err(|e| Error::kube("get", &kind, self.name, e))?;

        for entry in config.entries_mut() {
            entry.set_ca_bundle(self.ca_bundle);
            if let Some(policy) = self.failure_policy {
                entry.set_failure_policy(policy);
            }
        }

        api.replace(self.name, &PostParams::default(), &config)
            .await
            .map_err(|e| Error::kube("update", &kind, self.name, e))?;
        info!("patched {kind} {}", self.name);
        Ok(())
    }
}

/// Patch the validating and then the mutating webhook configuration.
///
/// Stops at the first failure. A validating configuration that was already
/// patched stays patched.
pub async fn patch_webhook_configurations(client: Client, patch: &WebhookPatch<'_>) -> Result<()> {
    info!(
        "patching webhook configurations '{}' mutating={}, validating={}, failurePolicy={}",
        patch.name,
        patch.mutating,
        patch.validating,
        patch.failure_policy.map_or("", |p| p.as_str()),
    );

    use AdmissionRegistrationVersion::*;
    if patch.validating {
        match patch.version {
            V1 => patch.apply::<v1::ValidatingWebhookConfiguration>(client.clone()).await?,
            V1Beta1 => {
                patch
                    .apply::<v1beta1::ValidatingWebhookConfiguration>(client.clone())
                    .await?
            }
        }
    } else {
        debug!("validating hook patching not required");
    }

    if patch.mutating {
        match patch.version {
            V1 => patch.apply::<v1::MutatingWebhookConfiguration>(client).await?,
            V1Beta1 => {
                patch
                    .apply::<v1beta1::MutatingWebhookConfiguration>(client)
                    .await?
            }
        }
    } else {
        debug!("mutating hook patching not required");
    }

    info!("successfully patched hook(s)");
    Ok(())
}
