//! The node model: parsed values and their lazy resolution.

pub mod entry;
pub mod node;
pub mod number;
pub mod value;

pub use entry::Entry;
pub use node::{
	Brackets, Call, Concat, ContextVar, Escape, Function, NativeFn, Node, SharedBuffer, Stream,
	Text,
};
pub use number::{Number, NumberValue};
pub use value::Value;
