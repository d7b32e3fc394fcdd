//! Library for deriving contract schemas from federated GraphQL supergraphs.
//!
//! A contract is a filtered public view of a schema. Elements are selected by the tags applied to
//! them with a tag directive (`@tag(name: "...")`): an include set keeps only elements carrying one
//! of its tags, an exclude set hides elements carrying any of its tags. Hidden elements are not
//! removed from the document; they are marked with a marker directive (`@inaccessible` by default)
//! so that downstream tooling can derive the API schema.
//!
//! After marking, the type graph is walked again from the root operation types and every type that
//! is no longer reachable is marked as well.
//!
//! The supergraph's join directives additionally tell which subgraphs own each schema coordinate,
//! which is reported alongside every excluded coordinate.

pub mod compiler;
pub mod coordinate;
pub mod error;
pub mod ownership;
pub mod reachability;
pub mod request;
pub mod rewrite;
pub mod rule;
pub mod tags;

pub use compiler::{CompiledContract, ContractCompiler, ExcludedCoordinate, ExclusionReason};
pub use coordinate::SchemaCoordinate;
pub use error::ContractError;
pub use ownership::OwnershipMap;
pub use reachability::{ReachabilityAnalyzer, ReachableTypes, reachable_types};
pub use request::{Contract, ContractRequest, CreateContractError};
pub use rewrite::{DirectiveRewriter, Rewritten};
pub use rule::{ContractRule, ValidationError};
pub use tags::TagIndex;
