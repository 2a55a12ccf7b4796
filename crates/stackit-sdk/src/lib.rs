//! Typed HTTP client for the STACKIT APIs consumed by `stackit-cli`.
//!
//! The crate is organised around three pieces:
//!
//! ```text
//! ┌──────────────┐   builds    ┌──────────────┐   ApiCall    ┌─────────────────┐
//! │ KmsClient    │ ──────────► │ Request<P,R> │ ───────────► │ dyn Transport   │
//! │ SfsClient    │             │  .payload()  │              │  HttpTransport  │
//! │ ...          │             │  .execute()  │ ◄─────────── │  (reqwest)      │
//! └──────────────┘             └──────────────┘  JSON value  └─────────────────┘
//! ```
//!
//! Service clients only know paths and models. Everything that touches the
//! network lives behind the [`Transport`] trait so callers can swap in an
//! in-memory implementation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod kms;
pub mod observability;
pub mod request;
pub mod resourcemanager;
pub mod sfs;
pub mod transport;

pub use error::{Result, SdkError};
pub use request::{NoContent, Request};
pub use transport::{ApiCall, HttpTransport, Method, Transport, TransportConfig};
