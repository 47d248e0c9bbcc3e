pub mod action;
pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod invoke;
pub mod io;
pub mod module;
pub mod params;
pub mod paths;
pub mod runner;
pub mod script;
pub mod step;
pub mod tree;

pub use action::{ActionDef, ActionKind};
pub use catalog::{ActionPath, Catalog};
pub use error::{FlowError, Result};
pub use module::Module;
pub use params::{ParamBag, ParamSpec};
pub use runner::{Observer, RunOutcome, Runner};
pub use step::{BoundArgs, Signal, Step};
