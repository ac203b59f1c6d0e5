//! Project rewriting around prebuilt artifacts
//!
//! Once a graph is evaluated, every node resolved from the cache is wired
//! into the targets that still build from source, and finally into the
//! consuming target itself:
//!
//! | Product        | Consumer settings                                   | Files                              |
//! |----------------|-----------------------------------------------------|------------------------------------|
//! | framework      | framework search path, `-iquote` into `Headers`, `-framework` when linked | header references dropped |
//! | static library | library search path, `-l` when linked, header search paths, module map flags | headers and module map staged |
//!
//! In both cases the dependency edge and the linked product are removed
//! from the consumer.

pub mod dependency;
pub mod embedder;
pub mod flags;
pub mod headers;
mod injector;
pub mod modulemap;
pub mod pods;
mod storage;

pub use injector::Injector;
pub use storage::InjectionStorage;
