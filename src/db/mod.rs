pub mod change_queue;
pub mod clients;
pub mod connection;
pub mod people;
pub mod sevis;
pub mod transact;

pub use clients::StoreClients;
pub use connection::AdminDatabase;
pub use transact::{transact, Upsert};
