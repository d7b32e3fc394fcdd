use apollo_compiler::Schema;
use apollo_compiler::ast::Document;
use apollo_compiler::validation::WithErrors;

use crate::coordinate::SchemaCoordinate;

/// An error while deriving ownership, reachability or a contract schema from a GraphQL document
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Could not parse GraphQL document: {0}")]
    GraphQLDocument(Box<WithErrors<Document>>),

    #[error("Could not build GraphQL schema: {0}")]
    GraphQLSchema(Box<WithErrors<Schema>>),

    #[error("Malformed supergraph: {0}")]
    MalformedSupergraph(String),

    #[error("Type {type_name} referenced by {referenced_by} is not defined")]
    UnknownTypeReference {
        type_name: String,
        referenced_by: SchemaCoordinate,
    },

    #[error("Invalid directive name: {0}")]
    InvalidDirectiveName(String),

    #[error("Removing unreachable types did not converge after {0} passes")]
    CascadeDidNotConverge(usize),
}

impl From<WithErrors<Document>> for ContractError {
    fn from(errors: WithErrors<Document>) -> Self {
        ContractError::GraphQLDocument(Box::new(errors))
    }
}

impl From<WithErrors<Schema>> for ContractError {
    fn from(errors: WithErrors<Schema>) -> Self {
        ContractError::GraphQLSchema(Box::new(errors))
    }
}
