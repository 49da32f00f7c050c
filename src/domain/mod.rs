pub mod node;
pub mod settings;
pub mod tree;
pub mod walker;
