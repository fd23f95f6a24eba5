pub mod connection;
pub mod page;

pub use connection::{CdpConnector, CdpLink};
pub use page::CdpPage;
