//! Per-question answer slots, index-aligned with the chosen question set.

use crate::core::error::IncompleteAnswersError;
use crate::core::types::{AnswerSlot, QuestionSet, Rating, ResolvedAnswer};

/// Ordered answer slots; slot `i` always belongs to question `i` of the set.
///
/// The store never validates rating labels. Completeness checks are the
/// controller's job via [`AnswerStore::is_complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerStore {
    slots: Vec<AnswerSlot>,
}

impl AnswerStore {
    /// Allocate one empty slot per question, in question order.
    pub fn initialize(questions: &QuestionSet) -> Self {
        let slots = questions
            .questions()
            .iter()
            .map(|question| AnswerSlot {
                question_index: question.question_index,
                dimension_a: None,
                dimension_b: None,
            })
            .collect();
        Self { slots }
    }

    /// Overwrite both ratings of the slot at `position`.
    ///
    /// Out-of-range positions are ignored; the controller only records at
    /// its own in-range position.
    pub fn record_answer(
        &mut self,
        position: usize,
        dimension_a: Option<Rating>,
        dimension_b: Option<Rating>,
    ) {
        if let Some(slot) = self.slots.get_mut(position) {
            slot.dimension_a = dimension_a;
            slot.dimension_b = dimension_b;
        }
    }

    /// True iff both dimensions at `position` are rated.
    pub fn is_complete(&self, position: usize) -> bool {
        self.slots
            .get(position)
            .is_some_and(|slot| slot.dimension_a.is_some() && slot.dimension_b.is_some())
    }

    pub fn slot(&self, position: usize) -> Option<&AnswerSlot> {
        self.slots.get(position)
    }

    pub fn slots(&self) -> &[AnswerSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        (0..self.slots.len())
            .filter(|&position| self.is_complete(position))
            .count()
    }

    /// Copy out every answer in question order.
    ///
    /// Fails listing every incomplete position if any slot lacks a rating.
    pub fn snapshot(&self) -> Result<Vec<ResolvedAnswer>, IncompleteAnswersError> {
        let mut resolved = Vec::with_capacity(self.slots.len());
        let mut missing = Vec::new();
        for (position, slot) in self.slots.iter().enumerate() {
            match (&slot.dimension_a, &slot.dimension_b) {
                (Some(dimension_a), Some(dimension_b)) => resolved.push(ResolvedAnswer {
                    question_index: slot.question_index,
                    dimension_a: dimension_a.clone(),
                    dimension_b: dimension_b.clone(),
                }),
                _ => missing.push(position),
            }
        }
        if !missing.is_empty() {
            return Err(IncompleteAnswersError { positions: missing });
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::question_set;

    fn rating(label: &str) -> Option<Rating> {
        Some(Rating::new(label))
    }

    #[test]
    fn initialize_allocates_empty_slots_in_question_order() {
        let set = question_set("set1", 3);
        let store = AnswerStore::initialize(&set);

        assert_eq!(store.len(), 3);
        for (position, slot) in store.slots().iter().enumerate() {
            assert_eq!(slot.question_index, set.questions()[position].question_index);
            assert!(slot.dimension_a.is_none());
            assert!(slot.dimension_b.is_none());
        }
    }

    #[test]
    fn is_complete_requires_both_dimensions() {
        let mut store = AnswerStore::initialize(&question_set("set1", 2));
        store.record_answer(0, rating("1"), None);
        assert!(!store.is_complete(0));

        store.record_answer(0, rating("1"), rating("4"));
        assert!(store.is_complete(0));
        assert!(!store.is_complete(1));
        assert!(!store.is_complete(7));
    }

    #[test]
    fn record_answer_overwrites_previous_values() {
        let mut store = AnswerStore::initialize(&question_set("set1", 1));
        store.record_answer(0, rating("1"), rating("2"));
        store.record_answer(0, rating("3"), None);

        let slot = store.slot(0).expect("slot");
        assert_eq!(slot.dimension_a, rating("3"));
        assert_eq!(slot.dimension_b, None);
    }

    #[test]
    fn snapshot_lists_every_incomplete_position() {
        let mut store = AnswerStore::initialize(&question_set("set1", 3));
        store.record_answer(1, rating("2"), rating("2"));
        store.record_answer(2, None, rating("2"));

        let err = store.snapshot().unwrap_err();
        assert_eq!(err.positions, vec![0, 2]);
    }

    /// Snapshot order follows the question set, not the answering order.
    #[test]
    fn snapshot_returns_question_order_regardless_of_answer_order() {
        let mut store = AnswerStore::initialize(&question_set("set1", 3));
        store.record_answer(2, rating("3"), rating("3"));
        store.record_answer(0, rating("1"), rating("1"));
        store.record_answer(1, rating("2"), rating("2"));

        let answers = store.snapshot().expect("snapshot");
        let indexes: Vec<u32> = answers.iter().map(|answer| answer.question_index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert_eq!(answers[2].dimension_a, Rating::new("3"));
        assert_eq!(store.answered_count(), 3);
    }
}
