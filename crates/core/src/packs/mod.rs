//! Pattern packs: per-domain extraction hints and learned domain state.

pub mod directives;
pub mod parser;
pub mod registry;
pub mod state;

pub use directives::{DepthMethod, Directive, PackSelectors, PatternPack, UrlTransform};
pub use parser::PackParser;
pub use registry::{PackRegistry, PackRegistryBuilder};
pub use state::{DomainState, JsonStateStore, MemoryStateStore, Provider, StateStore, state_domain};
