mod db;
mod helpers;
mod schema;

pub use db::*;
pub use helpers::*;
pub use schema::*;
