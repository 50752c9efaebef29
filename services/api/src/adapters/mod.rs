pub mod db;
pub mod mail;

pub use db::DbAdapter;
pub use mail::HttpMailAdapter;
