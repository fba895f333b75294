// Composition root for the payments bounded context.
//
// Responsibilities:
// - Read config from environment.
// - Instantiate concrete infrastructure implementations.
// - Wire implementations into use case handlers.
// - Spawn background workers (outbox relay, appointment consumer).
// - Expose the HTTP router and GraphQL schema to the binary.

pub mod config;
pub mod graphql;
pub mod http;
pub mod outbox_admin;
pub mod state;
pub mod workers;
