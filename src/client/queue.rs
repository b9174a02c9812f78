use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;

use crate::errors::SessionError;
use crate::proto::pdu::{Request, ResponseOrException};

/// One entry on the RTU single-flight queue: a request, where to deliver
/// its outcome, and the deadline covering the entire send+read.
pub struct QueuedRequest {
    pub unit_id: u8,
    pub request: Request,
    pub deadline: Duration,
    pub completion: oneshot::Sender<Result<ResponseOrException, SessionError>>,
}

/// FIFO submission side of the RTU queue. The worker loop living on the
/// receiving end owns the serial port exclusively and processes one
/// request at a time — strict FIFO, no concurrent transactions, matching
/// real RTU's physical half-duplex bus.
#[derive(Clone)]
pub struct QueueHandle {
    sender: mpsc::UnboundedSender<QueuedRequest>,
}

impl QueueHandle {
    pub fn new(sender: mpsc::UnboundedSender<QueuedRequest>) -> Self {
        Self { sender }
    }

    pub fn submit(
        &self,
        unit_id: u8,
        request: Request,
        deadline: Duration,
    ) -> Result<oneshot::Receiver<Result<ResponseOrException, SessionError>>, SessionError> {
        let (completion, rx) = oneshot::channel();
        self.sender
            .send(QueuedRequest {
                unit_id,
                request,
                deadline,
                completion,
            })
            .map_err(|_| SessionError::connection_lost("RTU worker task is gone"))?;
        Ok(rx)
    }
}

pub fn channel() -> (QueueHandle, mpsc::UnboundedReceiver<QueuedRequest>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueHandle::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submissions_are_received_in_fifo_order() {
        let (handle, mut rx) = channel();
        let _r1 = handle
            .submit(1, Request::ReadCoils { start: 0, count: 1 }, Duration::from_secs(1))
            .unwrap();
        let _r2 = handle
            .submit(1, Request::ReadCoils { start: 1, count: 1 }, Duration::from_secs(1))
            .unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.request, Request::ReadCoils { start: 0, count: 1 });
        assert_eq!(second.request, Request::ReadCoils { start: 1, count: 1 });
    }
}
