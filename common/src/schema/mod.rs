mod category;
mod donation;
mod mission;
mod project;
mod users;
mod wallet;

pub use category::*;
pub use donation::*;
pub use mission::*;
pub use project::*;
pub use users::*;
pub use wallet::*;
