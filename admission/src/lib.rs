// SPDX-License-Identifier: MIT

//! Kubernetes API types that are not shipped by `k8s-openapi`.
//!
//! `admissionregistration.k8s.io/v1beta1` webhook configurations were removed
//! from the generated bindings along with the API itself, but older clusters
//! still serve them.

pub mod v1beta1;
