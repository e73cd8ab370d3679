pub mod check;
pub mod config;
pub mod fetch;
pub mod html;
pub mod migrate;
pub mod runtime;
pub mod schema;
pub mod slug;
pub mod youtube;
