//! Label Reveal - Ground-truth Engagement After a Delay
//!
//! An observation's label is read the instant the tweet arrives, when
//! its engagement counts are usually still zero. The revealer keeps a
//! queue of mementos and, once the stream clock (the `created_at` of the
//! newest observation) passes `created_at + reveal_delay`, looks the
//! tweets up again and reports the counts they have accumulated.
//!
//! Lookups are batched: nothing is fetched until `batch_size` mementos
//! are due, or until `flush` is called.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};

use crate::domain::record::{Features, Observation, Revealed, Target};
use crate::error::ApiError;
use crate::ports::tweet_lookup::{TweetLookup, MAX_LOOKUP_IDS};

/// Observation waiting for its label.
#[derive(Debug, Clone)]
struct Memento {
  index: u64,
  features: Features,
  expires_at: DateTime<Utc>,
}

/// Batches delayed engagement lookups for observed tweets.
pub struct LabelRevealer<L: TweetLookup> {
  lookup: Arc<L>,
  target: Target,
  reveal_after: Duration,
  batch_size: usize,
  /// Not yet due, in arrival order.
  pending: VecDeque<Memento>,
  /// Due, waiting for a full batch.
  due: Vec<Memento>,
}

impl<L: TweetLookup> LabelRevealer<L> {
  /// `batch_size` is clamped to `1..=MAX_LOOKUP_IDS`.
  pub fn new(lookup: Arc<L>, target: Target, reveal_after: Duration, batch_size: usize) -> Self {
    Self {
      lookup,
      target,
      reveal_after,
      batch_size: batch_size.clamp(1, MAX_LOOKUP_IDS),
      pending: VecDeque::new(),
      due: Vec::new(),
    }
  }

  /// Mementos not yet revealed, due or not.
  pub fn outstanding(&self) -> usize {
    self.pending.len() + self.due.len()
  }

  /// Queue `observation` and reveal whatever has become due.
  ///
  /// Returns an empty list until a full batch is due.
  ///
  /// # Errors
  /// Propagates a failed lookup; the due mementos stay queued and are
  /// retried on the next call.
  #[instrument(skip(self, observation), fields(index = observation.index))]
  pub async fn observe(&mut self, observation: &Observation) -> Result<Vec<Revealed>, ApiError> {
    let now = observation.features.created_at;
    self.pending.push_back(Memento {
      index: observation.index,
      features: observation.features.clone(),
      // Out of range: never due, revealed only by `flush`.
      expires_at: now
        .checked_add_signed(self.reveal_after)
        .unwrap_or(DateTime::<Utc>::MAX_UTC),
    });

    while self.pending.front().is_some_and(|m| m.expires_at <= now) {
      if let Some(memento) = self.pending.pop_front() {
        self.due.push(memento);
      }
    }

    if self.due.len() < self.batch_size {
      return Ok(Vec::new());
    }
    self.reveal_due().await
  }

  /// Reveal everything queued, due or not.
  ///
  /// # Errors
  /// Propagates a failed first lookup. A later chunk failing keeps what
  /// was already revealed and leaves the rest queued.
  pub async fn flush(&mut self) -> Result<Vec<Revealed>, ApiError> {
    self.due.extend(self.pending.drain(..));
    self.reveal_due().await
  }

  async fn reveal_due(&mut self) -> Result<Vec<Revealed>, ApiError> {
    let mut revealed = Vec::with_capacity(self.due.len());

    while !self.due.is_empty() {
      let take = self.due.len().min(self.batch_size);
      let ids: Vec<String> = self.due[..take]
        .iter()
        .map(|m| m.features.id.clone())
        .collect();

      let counts = match self.lookup.engagement(&ids).await {
        Ok(counts) => counts,
        Err(e) if revealed.is_empty() => return Err(e),
        Err(e) => {
          warn!(error = %e, remaining = self.due.len(), "Lookup failed, rest retried later");
          break;
        }
      };

      for memento in self.due.drain(..take) {
        match counts.get(&memento.features.id) {
          Some(engagement) => revealed.push(Revealed {
            index: memento.index,
            label: engagement.get(self.target),
            features: memento.features,
          }),
          None => debug!(
            tweet_id = %memento.features.id,
            "Tweet no longer available, label dropped"
          ),
        }
      }
    }

    info!(revealed = revealed.len(), pending = self.pending.len(), "Labels revealed");
    Ok(revealed)
  }
}
