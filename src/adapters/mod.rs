// Adapters layer: concrete implementations of the collaborators the core runs against.

pub mod store;

pub use store::InMemoryStore;
