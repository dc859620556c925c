pub mod index;
pub mod parser;
pub mod refresher;
pub mod source;

pub use parser::{HostsFileEntry, ListEntry, ListParser};
pub use refresher::ListRefresher;
pub use source::ListSource;
