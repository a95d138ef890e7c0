mod atomic;
pub mod store;

pub use store::JsonFileStore;
