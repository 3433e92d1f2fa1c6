pub mod board;
pub mod cloning;
pub mod connections;
pub mod execution;
pub mod layout;
pub mod nodes;
pub mod pins;
pub mod types;
pub mod values;

#[cfg(test)]
mod tests;
