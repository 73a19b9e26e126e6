//! # Fieldchain: Command-Chain Field Resolution
//!
//! Fieldchain turns raw records (JSON documents) into entities. Each entity
//! field is described by an ordered list of commands; the commands are folded
//! left to right over a list of string values, starting from an empty list.
//!
//! ## Commands
//!
//! - **literal**: append a constant
//! - **entity**: append the pseudo-reference token of another entity
//! - **column**: append the values a path query selects from the record
//! - **regex_split**: split every value by a pattern
//! - **regex**: keep the first capture group (or whole match) of matching values
//! - **transformer**: replace the values with a registered transform's output
//! - **augmentor**: append a registered transform's output
//! - **template**: append a rendered Handlebars template
//!
//! Unknown commands are skipped unless `strict_commands` is set.
//!
//! ## Example
//!
//! ```yaml
//! entities:
//!   person:
//!     schema: Person
//!     properties:
//!       name:
//!         - column: "$.names[*]"
//!         - regex_split: "\\s*;\\s*"
//!         - transformer: contrib.transformers.trim_string
//!       birth_date:
//!         - column: "$.dob"
//!         - transformer:
//!             name: contrib.transformers.anydate_parser
//!             params:
//!               dayfirst: true
//!       label:
//!         - template: "{{upper record.country}}: {{entity.name.[0]}}"
//! ```

pub mod command;
pub mod contrib;
pub mod entity;
pub mod error;
pub mod extraction;
pub mod mapping;
pub mod operators;
pub mod reference;
pub mod resolver;
pub mod serialization;
pub mod template;
pub mod transform_registry;

// Re-export key types
pub use command::{Command, PropertyConfig, TransformSpec};
pub use entity::{Entity, EntityContext, Properties};
pub use error::{ConfigError, ResolveError};
pub use extraction::{Extractor, FieldPath};
pub use mapping::{EntityMapping, Mapper, MappingConfig};
pub use reference::{is_pseudo_reference, pseudo_reference};
pub use resolver::{apply_commands, resolve_constant_meta, OperatorSet, ResolveScope, Resolver, ResolverOptions};
pub use serialization::{EntityWriter, JsonArrayWriter, NdjsonWriter, SerializationError};
pub use template::TemplateRenderer;
pub use transform_registry::{TransformError, TransformFn, TransformParams, TransformRegistry};
