// ABOUTME: MySQL driver module
// ABOUTME: Exports the mysql_async backed session and value conversion

pub mod connection;
pub mod value;

pub use connection::MySqlSession;
pub use value::from_mysql;
