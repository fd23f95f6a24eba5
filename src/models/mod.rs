pub mod loaders;
pub mod order;
pub mod product;
pub mod result;
pub mod status;

pub use loaders::{load_catalog, load_orders, parse_orders};
pub use order::{OptionField, OrderSpec, PlannedField};
pub use product::{CatalogEntry, ProductCatalog, ProductFamily, ProductTarget, StaticCatalog};
pub use result::{
    BatchEntry, ExecutionResult, ExecutionStatus, FieldRef, StepOutcome, StepResult, SubmitOutcome,
};
pub use status::{BatchProgress, RunStatus, Step, StatusUpdate};
