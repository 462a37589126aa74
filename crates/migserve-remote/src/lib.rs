pub mod source;

pub use source::{RemoteMigration, RemoteSource};
