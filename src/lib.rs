//! Parley is the state-synchronization and request-orchestration engine of a
//! persona chat client: the headless component that keeps an optimistic local
//! conversation, a remote document store reached only through asynchronous
//! change notifications, and a single-flight text-generation request per user
//! turn all in agreement.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation state machine, the character registry,
//!   session bookkeeping, and the generation request lifecycle.
//! - [`store`] defines the persistent-store contract (point reads, point
//!   writes, document and collection subscriptions) plus an in-memory
//!   implementation used for tests and offline operation.
//! - [`subscription`] manages store-subscription lifecycles, guaranteeing one
//!   live subscription per logical target and clean, idempotent teardown.
//! - [`api`] defines the generation-client contract and an HTTP
//!   implementation with its wire payloads.
//! - [`auth`] defines the identity-provider contract that gates all store
//!   traffic until an owner identity is established.
//! - [`client`] composes the layers into a [`client::ChatClient`] facade that
//!   a rendering layer drives through discrete events.
//!
//! Nothing in this crate renders, reads files, or parses a command line;
//! those concerns belong to the embedding application.

pub mod api;
pub mod auth;
pub mod client;
pub mod core;
pub mod logging;
pub mod store;
pub mod subscription;
