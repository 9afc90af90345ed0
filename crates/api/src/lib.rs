//! Liquidator API clients for external services.
//!
//! This crate provides the subgraph client used to enumerate the protocol's
//! account universe: cursor pagination over the indexed `makers`/`traders`
//! collections and the [`AccountSource`] seam consumed by the run controller.

mod subgraph;

pub use subgraph::{
    AccountCategory, AccountSource, GraphAccount, GraphResponse, GraphTransport,
    HttpGraphTransport, SubgraphClient, MAX_PAGE_SIZE,
};
