pub mod factory;
pub mod pin;

pub use factory::{DefaultPinFactory, PinFactory};
pub use pin::Pin;
