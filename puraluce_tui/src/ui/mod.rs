pub mod main_view;
pub mod markdown;
