pub mod items;
pub mod stacks;
pub mod transfer;
