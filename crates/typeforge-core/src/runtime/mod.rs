//! Loading compiled modules and working with their types.
//!
//! ```text
//! bytes ──► LoadedModule (owns LoadContext)
//!               ├── get_type(name) ──► TypeHandle<'_> ──► Instance
//!               │                          └── detach() ──► TypeToken (checked)
//!               └── dispose() ──► later access fails with ModuleUnloaded
//! ```

mod contract;
mod instance;
mod loaded;
mod value;

pub use contract::ViewModel;
pub use instance::{Instance, PropertyChangedHandler};
pub use loaded::{LoadedModule, TypeHandle, TypeToken};
pub use value::Value;
