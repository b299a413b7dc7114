pub mod config;
pub mod database;
pub mod machine_id;
pub mod terminal;
pub mod usage;
