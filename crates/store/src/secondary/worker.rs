//! Bounded pool of secondary writers shared by all requests. Every job carries a reply
//! channel, so a put observes its own write outcome just like a synchronous write.
use std::sync::Arc;

use alloy_primitives::{Bytes, B256};
use tokio::sync::oneshot;
use tracing::debug;

use super::{SecondaryError, WriteTargets};

struct WriteJob {
    key: B256,
    value: Bytes,
    reply: oneshot::Sender<Result<(), SecondaryError>>,
}

pub(crate) struct WritePool {
    jobs: async_channel::Sender<WriteJob>,
}

impl WritePool {
    /// Workers exit once the pool is dropped and the queue is drained.
    pub(crate) fn spawn(workers: usize, queue_size: usize, targets: Arc<WriteTargets>) -> Self {
        let (jobs, queue) = async_channel::bounded::<WriteJob>(queue_size.max(1));
        for id in 0..workers {
            let queue = queue.clone();
            let targets = targets.clone();
            tokio::spawn(async move {
                while let Ok(job) = queue.recv().await {
                    let res = targets.write_all(job.key, &job.value).await;
                    if job.reply.send(res).is_err() {
                        debug!(target: "secondary_store", "writer {}: requester went away", id);
                    }
                }
                debug!(target: "secondary_store", "writer {} stopped", id);
            });
        }
        Self { jobs }
    }

    /// Waits for queue space, then for the write outcome.
    pub(crate) async fn submit(&self, key: B256, value: Bytes) -> Result<(), SecondaryError> {
        let (reply, outcome) = oneshot::channel();
        self.jobs
            .send(WriteJob { key, value, reply })
            .await
            .map_err(|_| SecondaryError::PoolClosed)?;
        outcome.await.map_err(|_| SecondaryError::PoolClosed)?
    }
}
