pub mod item_operations;
