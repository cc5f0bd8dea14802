pub mod bases;
pub mod collapse;
pub mod error;
pub mod extract;
pub mod frontmatter;
pub mod links;
pub mod names;
pub mod pipeline;
pub mod registry;

pub use error::{Result, TidyError};
pub use extract::extract_archive;
pub use pipeline::{clean_tree, publish, CleanOptions, Summary};
pub use registry::DatabaseRegistry;
