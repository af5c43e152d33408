//! The client side of the SASL GSSAPI mechanism.
//!
//! This crate acquires kerberos credentials, drives the initiator side
//! of security context establishment one token at a time, and protects
//! messages with the resulting context. Moving tokens between client
//! and server is left to the caller, so is SASL framing.
//!
//! All calls into gssapi go through the [`Provider`](provider::Provider)
//! trait. With the `krb5` feature, [`krb5::Gssapi`] implements it on top
//! of the system gssapi library.
//!
//! Every handle (names, credentials, contexts) is released
//! automatically when dropped, on success and error paths alike.
#[macro_use]
extern crate bitflags;

pub mod config;
pub mod context;
pub mod credential;
pub mod error;
#[cfg(feature = "krb5")]
pub mod krb5;
pub mod name;
pub mod oid;
pub mod provider;
pub mod status;
pub mod util;

pub use config::ClientConfig;
pub use context::{delete_context, negotiate, wrap_message, ClientCtx, CtxFlags, CtxState, Step};
pub use credential::{acquire_credential, credential_display_name, Cred};
pub use error::{Error, MajorFlags, NameStage, StatusCode};
pub use name::{canonicalize_principal, Name};
pub use oid::NameType;
pub use provider::{CredUsage, InitOutput, Provider, StatusClass};
pub use status::{describe, describe_status, StatusMessages};
