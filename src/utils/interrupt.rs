use futures::stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How the interrupt watcher ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The signal source ended before any interrupt arrived.
    Quiet,
    /// The run was cancelled and no second interrupt followed.
    Cancelled,
    /// A second interrupt arrived after cancellation; the caller should exit now.
    Forced,
}

/// The first interrupt cancels `cancel` so the run can drain and save; the
/// second resolves to `Interrupt::Forced`.
pub async fn watch_interrupts<S>(mut signals: S, cancel: CancellationToken) -> Interrupt
where
    S: Stream<Item = ()> + Unpin,
{
    if signals.next().await.is_none() {
        return Interrupt::Quiet;
    }
    warn!("Interrupt received, stopping after the current batch (press Ctrl-C again to exit now)");
    cancel.cancel();

    if signals.next().await.is_none() {
        return Interrupt::Cancelled;
    }
    warn!("Second interrupt received, exiting without writing results");
    Interrupt::Forced
}

/// Ctrl-C presses as a stream; ends if the handler cannot be installed.
pub fn ctrl_c_stream() -> impl Stream<Item = ()> + Unpin {
    Box::pin(futures::stream::unfold((), |_| async {
        tokio::signal::ctrl_c().await.ok().map(|_| ((), ()))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_no_interrupt_leaves_run_alone() {
        let cancel = CancellationToken::new();
        let outcome = watch_interrupts(stream::empty::<()>(), cancel.clone()).await;
        assert_eq!(outcome, Interrupt::Quiet);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels() {
        let cancel = CancellationToken::new();
        let outcome = watch_interrupts(stream::iter(vec![()]), cancel.clone()).await;
        assert_eq!(outcome, Interrupt::Cancelled);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let cancel = CancellationToken::new();
        let outcome = watch_interrupts(stream::iter(vec![(), ()]), cancel.clone()).await;
        assert_eq!(outcome, Interrupt::Forced);
        assert!(cancel.is_cancelled());
    }
}
