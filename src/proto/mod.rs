pub mod encode;
pub mod packet;
pub mod transport;
