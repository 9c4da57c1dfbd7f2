#![doc = include_str!("../README.md")]
// No warnings
//#![deny(warnings)]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]

pub mod adjacency;
pub mod config;
pub mod degree;
pub mod driver;
pub mod edge_data;
pub mod edge_value;
pub mod id_translate;
pub mod paths;
pub mod shovel;
pub mod sort;
pub mod text_input;

#[cfg(feature = "cli")]
pub mod cli;

/// Prelude module to import everything from this crate
pub mod prelude {
    pub use crate::config::SharderConfig;
    pub use crate::degree::{DegreeStrategy, DegreeTable};
    pub use crate::driver::{GraphSharder, ShardingManifest};
    pub use crate::edge_value::{
        EdgeProcessor, EdgeValueCodec, EmptyCodec, NoOpProcessor, RawBytesCodec, TextTokenProcessor,
    };
    pub use crate::id_translate::IdTranslate;
    pub use crate::text_input::{parse_line, EdgeLine};
}
