pub mod error;
pub mod model;
pub mod types;

pub use error::{QueryError, Result};
pub use model::{FieldGetter, Model, ModelMeta};
pub use types::*;
