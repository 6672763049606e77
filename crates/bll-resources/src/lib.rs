//! BLL Resources
//!
//! A backend-agnostic CRUD contract and its implementations.
//!
//! # Overview
//!
//! Managers never touch storage directly; they own a [`ResourceClient`]. The
//! same calls work whether rows live in a local table
//! ([`DatabaseResourceClient`]) or behind third-party APIs
//! ([`ExternalResourceClient`], [`DirectProviderResourceClient`]).
//!
//! # Representations
//!
//! Every read accepts a [`ReturnType`]: the backend's own object (`Db`), a
//! plain mapping (`Dict`) or a schema-checked [`ModelInstance`] (`Model`).
//! `fields` narrows `Dict` and `Model` shapes to the listed fields plus `id`.
//!
//! # Errors
//!
//! All clients report the same [`ResourceError`] outcomes: `NotFound` (404),
//! `Validation` (422), `Backend` (400) and `Internal` (500).

pub mod client;
pub mod database;
pub mod error;
pub mod external;
pub mod filter;
pub mod memory;
pub mod model;
pub mod types;

pub use client::{
    CountRequest, CreateRequest, DeleteRequest, ExistsRequest, GetRequest, ListRequest,
    ResourceClient, SearchRequest, UpdateRequest,
};
pub use database::{DatabaseResourceClient, EntityTable};
pub use error::{ResourceError, Result};
pub use external::{
    DirectGateway, DirectProviderResourceClient, Envelope, ExternalClient, ExternalProvider,
    ExternalResourceClient, FieldMapping, ProviderGateway, ProviderOperation, RotationGateway,
    RoundRobinRotation, Rotation, NOT_FOUND_MARKER,
};
pub use filter::{Filter, FilterOp};
pub use memory::InMemoryTable;
pub use model::{FieldDef, FieldKind, ModelInstance, ModelSchema};
pub use types::{Record, Resource, ReturnType, StoredRecord, ID_FIELD};
