pub mod signal_store;
pub mod theme;
