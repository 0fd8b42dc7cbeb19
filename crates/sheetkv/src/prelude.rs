//! Prelude module - common imports for sheetkv users
//!
//! ```rust
//! use sheetkv::prelude::*;
//! ```

pub use crate::{
    CellAddress,
    CellFactSink,
    CellFactSource,
    CellInput,
    CellRange,
    CellUpdate,
    // Error types
    Error,
    // Configuration
    ExtractionConfig,
    KeyValueEntry,
    NumberFormatter,
    Result,
    SectionConfig,
    // Extraction
    SectionExtractor,
    SectionMap,
    SheetRef,
    ValueResolver,
    // Documents
    XlsxDocument,
};
