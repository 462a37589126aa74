pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use server::{BoundServer, ListingServer};
pub use state::{AppState, SharedState};
