pub mod parse;
pub mod suppliers;
pub mod validate;
