pub mod html;
pub mod node;
pub mod normalize;
pub mod operation;
pub mod path;
pub mod sanitize;

pub use html::{deserialize, deserialize_with, serialize, serialize_node, DecodeOptions};
pub use node::{Align, Document, Element, ElementKind, ListKind, Mark, Marks, Node, Text};
pub use normalize::next_fix;
pub use operation::{Operation, Properties};
pub use path::{Affinity, Path, Point, Range};
pub use sanitize::sanitize_markup;

#[cfg(test)]
mod tests;
