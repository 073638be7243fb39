// Data plane: single-object operations. Control plane: listing and bulk clear.
pub mod control;
pub mod data;
