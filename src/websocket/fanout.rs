use tokio::sync::mpsc;
use tracing::trace;

use super::client::EnvelopeStream;
use super::envelope::Envelope;

impl EnvelopeStream {
    /// Copies every envelope into `lanes` independent streams.
    ///
    /// This does not open another connection; it spawns a small demux task
    /// that reads this stream and clones each envelope into every lane that
    /// is still alive. Every lane sees the same order and ends when the
    /// source ends.
    pub fn fan_out(self, lanes: usize) -> Vec<EnvelopeStream> {
        let (senders, streams): (Vec<_>, Vec<_>) = (0..lanes)
            .map(|_| {
                let (tx, rx) = mpsc::unbounded_channel();
                (tx, EnvelopeStream::new(rx))
            })
            .unzip();

        let mut source = self;
        tokio::spawn(async move {
            let mut senders = senders;
            while let Some(envelope) = source.next_envelope().await {
                senders.retain(|lane| lane.send(envelope.clone()).is_ok());
                if senders.is_empty() {
                    trace!("All fan-out lanes dropped");
                    break;
                }
            }
        });

        streams
    }

    /// Splits into two streams by predicate.
    ///
    /// Envelopes for which `predicate` returns `true` go to the first stream,
    /// everything else to the second. Useful to keep chatty market data from
    /// delaying private order and balance updates.
    pub fn partition<F>(self, mut predicate: F) -> (EnvelopeStream, EnvelopeStream)
    where
        F: FnMut(&Envelope) -> bool + Send + 'static,
    {
        let (matched_tx, matched_rx) = mpsc::unbounded_channel();
        let (rest_tx, rest_rx) = mpsc::unbounded_channel();

        let mut source = self;
        tokio::spawn(async move {
            while let Some(envelope) = source.next_envelope().await {
                let lane = if predicate(&envelope) {
                    &matched_tx
                } else {
                    &rest_tx
                };
                let _ = lane.send(envelope);
            }
        });

        (
            EnvelopeStream::new(matched_rx),
            EnvelopeStream::new(rest_rx),
        )
    }
}

/// Whether an envelope belongs to one of the caller's private topics
pub fn is_private(envelope: &Envelope) -> bool {
    envelope
        .topic()
        .map(|topic| topic.market_id().is_none())
        .unwrap_or(false)
}
