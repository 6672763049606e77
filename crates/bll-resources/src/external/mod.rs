//! Third-party provider backed resources
//!
//! An [`ExternalClient`] makes a provider-backed resource look like a table:
//! it renames fields, calls a [`ProviderGateway`] and translates the returned
//! [`Envelope`] into the resource contract.

pub mod client;
pub mod envelope;
pub mod gateway;
pub mod mapping;
pub mod provider;
pub mod rotation;

pub use client::{DirectProviderResourceClient, ExternalClient, ExternalResourceClient};
pub use envelope::{Envelope, NOT_FOUND_MARKER};
pub use gateway::{DirectGateway, ProviderGateway, RotationGateway};
pub use mapping::FieldMapping;
pub use provider::{dispatch, ExternalProvider, ProviderOperation};
pub use rotation::{RoundRobinRotation, Rotation};
