//! GitHub GraphQL layer
//!
//! This module provides:
//! - GraphqlTransport trait and GithubError
//! - GithubClient over reqwest
//! - Query documents and response decoding
//! - PageSource implementations for each paged connection

pub mod client;
pub mod graphql;
pub mod mock;
pub mod queries;
pub mod sources;

pub use client::{GithubError, GraphqlTransport};
pub use graphql::{GithubClient, parse_graphql_response};
pub use mock::MockTransport;
pub use sources::{ContributionSource, OrgRepositorySource, OrgSearchSource, UserSearchSource, fetch_org_members};
