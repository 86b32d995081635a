mod document;
mod memory;
mod path;
mod query;
mod store;
mod subscription;
mod transaction;
mod util;

pub use document::*;
pub use memory::*;
pub use path::*;
pub use query::*;
pub use store::*;
pub use subscription::*;
pub use transaction::*;
pub use util::*;
