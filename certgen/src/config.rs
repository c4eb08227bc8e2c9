// SPDX-License-Identifier: MIT

//! Command line arguments and the validated configuration built from them.

use std::fmt::{self, Display};
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::error::{Error, Result};
use crate::webhook::{AdmissionRegistrationVersion, FailurePolicy};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a kubeconfig. Uses the in-cluster or default configuration if unset
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Log filter, e.g. `info` or `certgen=debug`
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Name of the CA field in the secret
    #[arg(long, global = true, default_value = "ca")]
    pub ca_name: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a ca and server cert+key and store the results in a secret 'secret-name' in 'namespace'
    Create(CreateArgs),
    /// Patch a ValidatingWebhookConfiguration, MutatingWebhookConfiguration and CustomResourceDefinitions
    /// with the ca from 'secret-name' in 'namespace'
    Patch(PatchArgs),
    /// Print the version
    Version,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Comma-separated hostnames and IPs to generate a certificate for
    #[arg(long)]
    pub host: String,

    /// Name of the secret where certificate information will be written
    #[arg(long)]
    pub secret_name: String,

    /// Namespace of the secret where certificate information will be written
    #[arg(long)]
    pub namespace: String,

    /// Name of cert file in the secret
    #[arg(long, default_value = "cert")]
    pub cert_name: String,

    /// Name of key file in the secret
    #[arg(long, default_value = "key")]
    pub key_name: String,
}

#[derive(Args, Debug)]
pub struct PatchArgs {
    /// Name of the secret where certificate information will be read from
    #[arg(long)]
    pub secret_name: String,

    /// Namespace of the secret where certificate information will be read from
    #[arg(long)]
    pub namespace: String,

    /// Name of ValidatingWebhookConfiguration and MutatingWebhookConfiguration that will be updated
    #[arg(long)]
    pub webhook_name: String,

    /// If true, patch ValidatingWebhookConfiguration
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub patch_validating: bool,

    /// If true, patch MutatingWebhookConfiguration
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub patch_mutating: bool,

    /// If set, patch the webhooks with this failure policy. Valid options are Ignore or Fail
    #[arg(long, default_value = "")]
    pub patch_failure_policy: String,

    /// admissionregistration.k8s.io api version
    #[arg(long, default_value = "v1")]
    pub admission_registration_version: String,

    /// Comma-separated CustomResourceDefinition names for which to patch the conversion webhook caBundle
    #[arg(long, value_delimiter = ',')]
    pub crds: Vec<String>,

    /// Comma-separated CustomResourceDefinition API Groups for which to patch the conversion webhook caBundle
    #[arg(long, value_delimiter = ',')]
    pub crd_api_groups: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

impl Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Secret field names of the CA bundle, certificate and key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldNames {
    pub ca: String,
    pub cert: String,
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateConfig {
    pub hosts: String,
    pub secret: SecretRef,
    pub fields: FieldNames,
}

impl CreateConfig {
    pub fn new(args: CreateArgs, ca_name: String) -> Self {
        Self {
            hosts: args.host,
            secret: SecretRef {
                namespace: args.namespace,
                name: args.secret_name,
            },
            fields: FieldNames {
                ca: ca_name,
                cert: args.cert_name,
                key: args.key_name,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchConfig {
    pub secret: SecretRef,
    pub ca_name: String,
    pub webhook_name: String,
    pub patch_validating: bool,
    pub patch_mutating: bool,
    pub failure_policy: Option<FailurePolicy>,
    pub version: AdmissionRegistrationVersion,
    pub crds: Vec<String>,
    pub crd_api_groups: Vec<String>,
}

fn non_empty(values: Vec<String>) -> Vec<String> {
    values.into_iter().filter(|v| !v.is_empty()).collect()
}

impl PatchConfig {
    pub fn new(args: PatchArgs, ca_name: String) -> Result<Self> {
        if !args.patch_validating && !args.patch_mutating {
            return Err(Error::InvalidArgument(
                "patch-validating=false, patch-mutating=false. You must patch at least one kind \
                 of webhook, otherwise this command is a no-op"
                    .to_string(),
            ));
        }
        let failure_policy = match args.patch_failure_policy.as_str() {
            "" => None,
            policy => Some(policy.parse()?),
        };

        Ok(Self {
            secret: SecretRef {
                namespace: args.namespace,
                name: args.secret_name,
            },
            ca_name,
            webhook_name: args.webhook_name,
            patch_validating: args.patch_validating,
            patch_mutating: args.patch_mutating,
            failure_policy,
            version: args.admission_registration_version.parse()?,
            crds: non_empty(args.crds),
            crd_api_groups: non_empty(args.crd_api_groups),
        })
    }
}
