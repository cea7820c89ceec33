pub mod config;
pub mod fanout;
pub mod layout;
pub mod limits;
pub mod model;
pub mod observability;
pub mod wire;
