mod queue;
mod reconnect;
mod session;
mod state;
mod transaction;
mod validate;

pub use queue::{QueueHandle, QueuedRequest};
pub use reconnect::ReconnectPolicy;
pub use session::{SerialSession, TcpSession};
pub use state::ConnectionState;
pub use transaction::TransactionRegistry;
