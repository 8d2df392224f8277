//! @ai:module:intent Comment-driven annotation engine for C-family sources
//! @ai:module:layer infrastructure
//! @ai:module:public_api engine, transform, generate, runtime, classifier, extensions, table, annotation, config, job, language, output, error
//!
//! # guardmark
//!
//! Reads `// @Name(args)` comments placed above C functions, wraps
//! functions annotated with `@When(SYMBOL)` (or an extension based on it)
//! in `#ifdef SYMBOL` / `#endif`, and emits a declarations header plus a
//! data source describing every annotation so a program can look them up
//! at run time.
//!
//! ## Example
//!
//! ```rust,no_run
//! use guardmark_engine::{Engine, EngineConfig, FilePair, RunPlan};
//! use std::path::PathBuf;
//!
//! let plan = RunPlan {
//!     extensions: PathBuf::from("include/annotations_base.h"),
//!     declarations: PathBuf::from("build/annotations.h"),
//!     data: PathBuf::from("build/annotations.c"),
//!     pairs: vec![FilePair::parse("tests/suite.c:build/suite.c").unwrap()],
//!     manifest: None,
//! };
//! let summary = Engine::new(EngineConfig::default()).run(&plan).unwrap();
//! println!("{} annotations", summary.annotations.len());
//! ```

pub mod annotation;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod extensions;
pub mod generate;
pub mod job;
pub mod language;
pub mod output;
pub mod runtime;
pub mod table;
pub mod transform;

pub use annotation::{Annotation, AnnotationUse, BlockKind, Extension, Location, WHEN_ANNOTATION};
pub use config::{DisableConfig, EngineConfig, LimitConfig};
pub use engine::{Engine, FileReport, RunPlan, RunSummary};
pub use error::{CapacityKind, Error, Result};
pub use extensions::ExtensionRegistry;
pub use generate::{include_guard_for, read_extension_lines, MetadataGenerator};
pub use job::FilePair;
pub use language::{detect_language, is_supported_file, Language};
pub use output::{format_run_summary, format_snapshot, to_json, OutputFormat};
pub use runtime::{AnnotatedBlock, Callable, RuntimeTable};
pub use table::{AnnotationTable, TableSnapshot};
pub use transform::{BraceScanner, TransformContext, TransformStats, Transformer};
