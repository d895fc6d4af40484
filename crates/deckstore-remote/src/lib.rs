// ABOUTME: Remote side of deckstore: fetching the published manifest and deck bodies.
// ABOUTME: The sync engine depends only on the RemoteLibrary trait defined here.

pub mod http;
pub mod library;
pub mod testing;

pub use http::HttpLibrary;
pub use library::{RemoteError, RemoteLibrary};
pub use testing::StaticLibrary;
