pub mod axis_sync;
pub mod cursor;
pub mod registry;
pub mod selection;
