pub mod frame;
pub(crate) mod server;
