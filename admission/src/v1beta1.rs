// SPDX-License-Identifier: MIT

//! `admissionregistration.k8s.io/v1beta1` webhook configurations.
//!
//! Only the fields that get rewritten are modelled. Everything else on a
//! webhook entry is carried in `extra` so a get/replace cycle does not drop
//! rules, selectors or side effect declarations.

use std::borrow::Cow;
use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use k8s_openapi::ClusterResourceScope;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use kube::core::TypeMeta;
use serde::{Deserialize, Serialize};

pub const GROUP: &str = "admissionregistration.k8s.io";
pub const VERSION: &str = "v1beta1";

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<ByteString>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single webhook entry. Validating and mutating entries only differ in
/// fields kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub name: String,
    #[serde(default)]
    pub client_config: WebhookClientConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

macro_rules! webhook_configuration {
    ($name:ident, $plural:literal) => {
        #[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
        pub struct $name {
            #[serde(flatten, default)]
            pub types: Option<TypeMeta>,
            #[serde(default)]
            pub metadata: ObjectMeta,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub webhooks: Option<Vec<Webhook>>,
        }

        impl $name {
            pub fn new(name: &str, webhooks: Vec<Webhook>) -> Self {
                Self {
                    types: Some(TypeMeta {
                        api_version: format!("{GROUP}/{VERSION}"),
                        kind: stringify!($name).to_string(),
                    }),
                    metadata: ObjectMeta {
                        name: Some(name.to_string()),
                        ..Default::default()
                    },
                    webhooks: Some(webhooks),
                }
            }
        }

        impl Resource for $name {
            type DynamicType = ();
            type Scope = ClusterResourceScope;

            fn kind(_: &()) -> Cow<'_, str> {
                stringify!($name).into()
            }

            fn group(_: &()) -> Cow<'_, str> {
                GROUP.into()
            }

            fn version(_: &()) -> Cow<'_, str> {
                VERSION.into()
            }

            fn plural(_: &()) -> Cow<'_, str> {
                $plural.into()
            }

            fn meta(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

webhook_configuration!(
    ValidatingWebhookConfiguration,
    "validatingwebhookconfigurations"
);
webhook_configuration!(MutatingWebhookConfiguration, "mutatingwebhookconfigurations");
