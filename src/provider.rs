//! Authorization-server descriptors (data) and strategies (behavior).
//!
//! `descriptor` exposes validated metadata ([`ProviderDescriptor`]) covering the
//! HTTPS-only registration, token, and tenant-registration endpoints plus the grant
//! flags the server accepts. `strategy` defines [`ProviderStrategy`], an
//! HTTP-client-agnostic hook used by the HTTP transport to decorate token requests
//! and map error responses into the broker taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
