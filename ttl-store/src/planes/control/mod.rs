pub mod bulk_operations;
