pub mod endpoint_assembler;
pub mod families;
pub mod filter;
pub mod identifiers;
pub mod model_assembler;
pub mod name_parser;
pub mod spec_to_ir;
pub mod type_resolver;
pub mod usage;

pub use filter::FilterRule;
pub use spec_to_ir::{TransformOptions, select, transform};
pub use type_resolver::RequiredMode;
