mod dispatcher;
mod rtu;
mod tcp;

pub use dispatcher::{dispatch, Dispatch};
pub use rtu::{serve_rtu_over_tcp, serve_serial};
pub use tcp::serve as serve_tcp;
