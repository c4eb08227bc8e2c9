// SPDX-License-Identifier: MIT

//! Self-signed CA and serving certificate generation.

use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use openssl::asn1::{Asn1Integer, Asn1IntegerRef, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage,
    SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::{
    X509, X509Builder, X509Extension, X509Name, X509NameBuilder, X509NameRef, X509Ref,
    X509v3Context,
};

use crate::error::{Error, Result};

const SERIAL_BITS: i32 = 128;
/// Absorbs clock skew between this process and the first verifying client.
const BACKDATE_SECS: i64 = 5 * 60;
const LIFETIME_SECS: i64 = 100 * 365 * 24 * 60 * 60;
const CA_ORGANIZATION: &str = "nil1";
const LEAF_ORGANIZATION: &str = "nil2";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubjectAltName {
    Ip(IpAddr),
    Dns(String),
}

/// Comma-separated host names and IP addresses a certificate is valid for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostSpec(Vec<SubjectAltName>);

impl HostSpec {
    pub fn parse(hosts: &str) -> Self {
        let names = hosts
            .split(',')
            .map(|host| match host.parse::<IpAddr>() {
                Ok(ip) => SubjectAltName::Ip(ip),
                Err(_) => SubjectAltName::Dns(host.to_string()),
            })
            .collect();
        Self(names)
    }

    pub fn names(&self) -> &[SubjectAltName] {
        &self.0
    }

    fn extension(&self, ctx: &X509v3Context) -> Result<X509Extension, ErrorStack> {
        let mut san = SubjectAlternativeName::new();
        for name in &self.0 {
            match name {
                SubjectAltName::Ip(ip) => san.ip(&ip.to_string()),
                SubjectAltName::Dns(dns) => san.dns(dns),
            };
        }
        san.build(ctx)
    }
}

/// PEM-encoded CA bundle, serving certificate and its EC private key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustTriple {
    pub ca: Vec<u8>,
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
}

struct Validity {
    not_before: Asn1Time,
    not_after: Asn1Time,
}

impl Validity {
    fn starting_now() -> Result<Self, ErrorStack> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        let not_before = now - BACKDATE_SECS;
        Ok(Self {
            not_before: Asn1Time::from_unix(not_before)?,
            not_after: Asn1Time::from_unix(not_before + LIFETIME_SECS)?,
        })
    }
}

fn serial_number() -> Result<Asn1Integer, ErrorStack> {
    let mut serial = BigNum::new()?;
    serial.rand(SERIAL_BITS, MsbOption::MAYBE_ZERO, false)?;
    serial.to_asn1_integer()
}

fn p256_key() -> Result<PKey<Private>, ErrorStack> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
    PKey::from_ec_key(EcKey::generate(&group)?)
}

fn organization(name: &str) -> Result<X509Name, ErrorStack> {
    let mut builder = X509NameBuilder::new()?;
    builder.append_entry_by_nid(Nid::ORGANIZATIONNAME, name)?;
    Ok(builder.build())
}

fn template(
    subject: &X509NameRef,
    serial: &Asn1IntegerRef,
    validity: &Validity,
    key: &PKeyRef<Private>,
) -> Result<X509Builder, ErrorStack> {
    let mut builder = X509Builder::new()?;
    builder.set_version(2)?;
    builder.set_serial_number(serial)?;
    builder.set_subject_name(subject)?;
    builder.set_not_before(&validity.not_before)?;
    builder.set_not_after(&validity.not_after)?;
    builder.set_pubkey(key)?;
    Ok(builder)
}

fn ca_certificate(
    hosts: &HostSpec,
    validity: &Validity,
    serial: &Asn1IntegerRef,
    key: &PKeyRef<Private>,
) -> Result<X509, ErrorStack> {
    let name = organization(CA_ORGANIZATION)?;
    let mut builder = template(&name, serial, validity, key)?;
    builder.set_issuer_name(&name)?;
    builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
    builder.append_extension(
        KeyUsage::new()
            .critical()
            .digital_signature()
            .key_cert_sign()
            .build()?,
    )?;
    builder.append_extension(ExtendedKeyUsage::new().client_auth().server_auth().build()?)?;
    let key_id = SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
    builder.append_extension(key_id)?;
    let san = hosts.extension(&builder.x509v3_context(None, None))?;
    builder.append_extension(san)?;
    builder.sign(key, MessageDigest::sha256())?;
    Ok(builder.build())
}

fn leaf_certificate(
    hosts: &HostSpec,
    validity: &Validity,
    serial: &Asn1IntegerRef,
    key: &PKeyRef<Private>,
    ca: &X509Ref,
    ca_key: &PKeyRef<Private>,
) -> Result<X509, ErrorStack> {
    let name = organization(LEAF_ORGANIZATION)?;
    let mut builder = template(&name, serial, validity, key)?;
    builder.set_issuer_name(ca.subject_name())?;
    builder.append_extension(BasicConstraints::new().critical().build()?)?;
    builder.append_extension(
        KeyUsage::new()
            .critical()
            .digital_signature()
            .key_encipherment()
            .build()?,
    )?;
    builder.append_extension(ExtendedKeyUsage::new().server_auth().build()?)?;
    let authority_key_id = AuthorityKeyIdentifier::new()
        .keyid(false)
        .build(&builder.x509v3_context(Some(ca), None))?;
    builder.append_extension(authority_key_id)?;
    let san = hosts.extension(&builder.x509v3_context(Some(ca), None))?;
    builder.append_extension(san)?;
    builder.sign(ca_key, MessageDigest::sha256())?;
    Ok(builder.build())
}

/// Generate a CA and a serving certificate for `hosts`, both valid for a
/// hundred years.
///
/// The CA and the serving certificate carry the same subject alternative
/// names. Any failure of the random source or key generation aborts; a
/// partial triple is never returned.
pub fn generate(hosts: &str) -> Result<TrustTriple> {
    let hosts = HostSpec::parse(hosts);
    let validity = Validity::starting_now().map_err(Error::generation("validity window"))?;

    let ca_serial =
        serial_number().map_err(Error::generation("serial number for CA certificate"))?;
    let ca_key = p256_key().map_err(Error::generation("root key for CA certificate"))?;
    let ca = ca_certificate(&hosts, &validity, &ca_serial, &ca_key)
        .map_err(Error::generation("CA certificate"))?;
    let ca_pem = ca.to_pem().map_err(Error::encoding("CA certificate"))?;

    let leaf_key = p256_key().map_err(Error::generation("key for leaf certificate"))?;
    let key_pem = leaf_key
        .ec_key()
        .and_then(|key| key.private_key_to_pem())
        .map_err(Error::encoding("leaf key"))?;

    let leaf_serial =
        serial_number().map_err(Error::generation("serial number for leaf certificate"))?;
    let leaf = leaf_certificate(&hosts, &validity, &leaf_serial, &leaf_key, &ca, &ca_key)
        .map_err(Error::generation("leaf certificate"))?;
    let cert_pem = leaf.to_pem().map_err(Error::encoding("leaf certificate"))?;

    Ok(TrustTriple {
        ca: ca_pem,
        cert: cert_pem,
        key: key_pem,
    })
}
