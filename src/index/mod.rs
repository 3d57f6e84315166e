pub mod doc_index;
pub mod handle;
pub mod layout;
pub mod lock;
pub mod metadata;

pub use doc_index::{DocumentIndex, DocumentIndexWriter};
pub use handle::Index;
pub use layout::IndexLayout;
pub use metadata::IndexMetadata;
