pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Attach, Chat, Entropy, Garage, Init, Order, Robot, Version};
