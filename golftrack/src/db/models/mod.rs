pub mod rounds;
pub mod stats;
pub mod users;
