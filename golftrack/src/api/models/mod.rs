pub mod rounds;
pub mod users;
