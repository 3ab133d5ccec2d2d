//! Commit-stream validation: the checks an [`crate::AggregateReader`] runs over history
//! read back from an [`crate::EventReader`] before folding it into a memento.

use crate::error::CoreError;
use crate::event::SerializedEvent;
use crate::ids::AggregateId;

/// Validates that `events`, read back from a provider, form a single contiguous sequence
/// continuing on from `after_sequence` with no gaps, duplicates, or foreign aggregate ids.
///
/// `events` need not originate from a single [`crate::Commit`]; a reader typically
/// concatenates events from many commits across many pages before calling this. The three
/// checks below subsume commit-boundary contiguity: validating the flattened event stream
/// end to end makes a separate pass over commit boundaries redundant.
pub fn validate_commit_stream(
    aggregate_id: AggregateId,
    after_sequence: i64,
    events: &[SerializedEvent],
) -> Result<(), CoreError> {
    let mut expected = after_sequence + 1;
    for event in events {
        if event.aggregate_id != aggregate_id {
            return Err(CoreError::CorruptedHistory {
                aggregate_id,
                reason: format!(
                    "event at sequence {} belongs to aggregate {}",
                    event.sequence_number, event.aggregate_id
                ),
            });
        }
        if event.sequence_number != expected {
            return Err(CoreError::CorruptedHistory {
                aggregate_id,
                reason: format!(
                    "expected sequence number {expected}, found {}",
                    event.sequence_number
                ),
            });
        }
        expected += 1;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn event(aggregate_id: AggregateId, sequence_number: i64) -> SerializedEvent {
        SerializedEvent::new(
            aggregate_id,
            sequence_number,
            "Tested",
            b"{}".to_vec(),
            None,
            HashMap::new(),
        )
    }

    #[test]
    fn accepts_empty_history() {
        let id = AggregateId::new();
        assert!(validate_commit_stream(id, -1, &[]).is_ok());
    }

    #[test]
    fn accepts_contiguous_history_continuing_after_a_cursor() {
        let id = AggregateId::new();
        let events = vec![event(id, 3), event(id, 4), event(id, 5)];
        assert!(validate_commit_stream(id, 2, &events).is_ok());
    }

    #[test]
    fn rejects_a_gap() {
        let id = AggregateId::new();
        let events = vec![event(id, 0), event(id, 2)];
        let err = validate_commit_stream(id, -1, &events).unwrap_err();
        assert!(matches!(err, CoreError::CorruptedHistory { .. }));
    }

    #[test]
    fn rejects_a_duplicate() {
        let id = AggregateId::new();
        let events = vec![event(id, 0), event(id, 0)];
        let err = validate_commit_stream(id, -1, &events).unwrap_err();
        assert!(matches!(err, CoreError::CorruptedHistory { .. }));
    }

    #[test]
    fn rejects_history_not_continuing_from_the_cursor() {
        let id = AggregateId::new();
        let events = vec![event(id, 5)];
        let err = validate_commit_stream(id, -1, &events).unwrap_err();
        assert!(matches!(err, CoreError::CorruptedHistory { .. }));
    }

    #[test]
    fn rejects_a_foreign_aggregate_event() {
        let id = AggregateId::new();
        let other = AggregateId::new();
        let events = vec![event(id, 0), event(other, 1)];
        let err = validate_commit_stream(id, -1, &events).unwrap_err();
        assert!(matches!(err, CoreError::CorruptedHistory { .. }));
    }
}
