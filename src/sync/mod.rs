mod conn;
mod stream;


pub use conn::Conn;
pub use stream::{ReadWrite, Stream};
