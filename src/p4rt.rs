pub mod client;
pub mod index;
pub mod pipeconf;
pub mod pure;
pub mod stream;
pub mod transport;
