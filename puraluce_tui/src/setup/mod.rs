pub mod runtime;
pub mod state;
pub mod view;
