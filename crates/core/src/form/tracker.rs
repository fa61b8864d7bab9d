//! Field-completion tracking.
//!
//! The tracker is the only authority on which fields are still missing and
//! whether a record is complete. Language-model output feeds values in
//! through [`CompletionTracker::merge`], but its own "done" flag is never
//! consulted here.

use serde::Serialize;

use crate::form::definition::{FieldDefinition, FormDefinition};
use crate::form::record::{is_blank, DataRecord};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub record: DataRecord,
    pub next_field: Option<String>,
    pub complete: bool,
    pub missing_fields: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct CompletionTracker {
    form: FormDefinition,
}

impl CompletionTracker {
    pub fn new(form: FormDefinition) -> Self {
        Self { form }
    }

    pub fn form(&self) -> &FormDefinition {
        &self.form
    }

    /// First field, in declared order, that is required under the current
    /// record and has no non-blank value.
    pub fn next_missing_field(&self, record: &DataRecord) -> Option<&FieldDefinition> {
        self.form.fields().iter().find(|field| Self::is_missing(field, record))
    }

    pub fn missing_fields(&self, record: &DataRecord) -> Vec<&FieldDefinition> {
        self.form.fields().iter().filter(|field| Self::is_missing(field, record)).collect()
    }

    pub fn is_complete(&self, record: &DataRecord) -> bool {
        self.next_missing_field(record).is_none()
    }

    /// Exactly the defined keys; absent ones become empty strings.
    pub fn normalize(&self, record: &DataRecord) -> DataRecord {
        self.form
            .fields()
            .iter()
            .map(|field| {
                let value = record.get(&field.name).cloned().unwrap_or_default();
                (field.name.clone(), value)
            })
            .collect()
    }

    /// Last write wins for every key in `extracted`; nothing is validated.
    pub fn merge(&self, old: &DataRecord, extracted: &DataRecord) -> DataRecord {
        let mut merged = old.clone();
        for (key, value) in extracted {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Writes each skipped field's sentinel into an empty slot. A sentinel is
    /// cleared again only when the tracker wrote it: the field was skipped
    /// under `previous` and this turn's `extracted` did not supply it.
    pub fn resolve_skips(
        &self,
        previous: &DataRecord,
        record: &DataRecord,
        extracted: &DataRecord,
    ) -> DataRecord {
        let mut resolved = record.clone();
        for field in self.form.fields() {
            let Some(sentinel) = &field.skip_fill else {
                continue;
            };
            let current = record.get(&field.name);
            if !field.is_required(record) {
                if is_blank(current) {
                    resolved.insert(field.name.clone(), sentinel.clone());
                }
            } else if current == Some(sentinel)
                && !extracted.contains_key(&field.name)
                && !field.is_required(previous)
            {
                resolved.insert(field.name.clone(), String::new());
            }
        }
        resolved
    }

    pub fn apply_turn(&self, record: &DataRecord, extracted: &DataRecord) -> TurnOutcome {
        let previous = self.normalize(record);
        let merged = self.normalize(&self.merge(&previous, extracted));
        let record = self.normalize(&self.resolve_skips(&previous, &merged, extracted));

        let missing_fields =
            self.missing_fields(&record).into_iter().map(|field| field.name.clone()).collect();
        let next_field = self.next_missing_field(&record).map(|field| field.name.clone());
        let complete = next_field.is_none();

        TurnOutcome { record, next_field, complete, missing_fields }
    }

    fn is_missing(field: &FieldDefinition, record: &DataRecord) -> bool {
        field.is_required(record) && is_blank(record.get(&field.name))
    }
}

#[cfg(test)]
mod tests {
    use super::CompletionTracker;
    use crate::form::definition::{FieldDefinition, FieldType, FormDefinition};
    use crate::form::preset;
    use crate::form::record::DataRecord;

    fn record(pairs: &[(&str, &str)]) -> DataRecord {
        pairs.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect()
    }

    fn type_a_b() -> CompletionTracker {
        CompletionTracker::new(
            FormDefinition::new(vec![
                FieldDefinition::new("type", FieldType::String, "discriminator"),
                FieldDefinition::new("a", FieldType::String, "always"),
                FieldDefinition::new("b", FieldType::String, "only for X")
                    .required_when("type", "X"),
            ])
            .expect("valid form"),
        )
    }

    #[test]
    fn conditional_field_is_skipped_when_predicate_false() {
        let tracker = type_a_b();
        let record = record(&[("type", "Y"), ("a", "v")]);

        assert!(tracker.next_missing_field(&record).is_none());
        assert!(tracker.is_complete(&record));
    }

    #[test]
    fn conditional_field_is_asked_when_predicate_true() {
        let tracker = type_a_b();
        let record = record(&[("type", "X"), ("a", "v")]);

        assert_eq!(tracker.next_missing_field(&record).map(|f| f.name.as_str()), Some("b"));
        assert!(!tracker.is_complete(&record));
    }

    #[test]
    fn next_missing_follows_declared_order_and_ignores_whitespace_values() {
        let tracker = type_a_b();

        let empty = record(&[]);
        assert_eq!(tracker.next_missing_field(&empty).map(|f| f.name.as_str()), Some("type"));

        let blank_type = record(&[("type", "   "), ("a", "v")]);
        assert_eq!(tracker.next_missing_field(&blank_type).map(|f| f.name.as_str()), Some("type"));

        let missing_a = record(&[("type", "Y")]);
        assert_eq!(tracker.next_missing_field(&missing_a).map(|f| f.name.as_str()), Some("a"));
    }

    #[test]
    fn completeness_tracks_every_required_field() {
        let tracker = type_a_b();

        assert!(tracker.is_complete(&record(&[("type", "X"), ("a", "1"), ("b", "2")])));
        assert!(!tracker.is_complete(&record(&[("type", "X"), ("a", ""), ("b", "2")])));
        assert!(!tracker.is_complete(&record(&[])));
    }

    #[test]
    fn missing_fields_lists_all_required_blanks_in_order() {
        let tracker = type_a_b();
        let missing = tracker.missing_fields(&record(&[("type", "X")]));

        assert_eq!(missing.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn normalize_fills_defined_keys_and_drops_unknown_ones() {
        let tracker = type_a_b();
        let normalized = tracker.normalize(&record(&[("a", "v"), ("extra", "ignored")]));

        assert_eq!(normalized, record(&[("type", ""), ("a", "v"), ("b", "")]));
    }

    #[test]
    fn normalize_is_idempotent() {
        let tracker = type_a_b();
        let inputs =
            [record(&[]), record(&[("a", " v "), ("zzz", "1")]), record(&[("type", "X")])];
        for input in inputs {
            let once = tracker.normalize(&input);
            assert_eq!(tracker.normalize(&once), once);
        }
    }

    #[test]
    fn merge_prefers_new_values_and_keeps_old_ones() {
        let tracker = type_a_b();
        let old = record(&[("type", "X"), ("a", "old")]);
        let new = record(&[("a", "new"), ("b", "added")]);

        let merged = tracker.merge(&old, &new);

        assert_eq!(merged.get("a").map(String::as_str), Some("new"));
        assert_eq!(merged.get("b").map(String::as_str), Some("added"));
        assert_eq!(merged.get("type").map(String::as_str), Some("X"));
    }

    #[test]
    fn merge_allows_explicit_overwrite_with_empty_value() {
        let tracker = type_a_b();
        let merged = tracker.merge(&record(&[("a", "v")]), &record(&[("a", "")]));

        assert_eq!(merged.get("a").map(String::as_str), Some(""));
    }

    #[test]
    fn first_turn_on_admissions_form_asks_for_discriminator() {
        let tracker = CompletionTracker::new(preset::admissions());
        let outcome = tracker.apply_turn(&record(&[]), &record(&[("student_name", "Meera")]));

        assert_eq!(outcome.record.get("student_name").map(String::as_str), Some("Meera"));
        assert_eq!(outcome.record.len(), tracker.form().len());
        assert!(outcome
            .record
            .iter()
            .filter(|(key, _)| key.as_str() != "student_name")
            .all(|(_, value)| value.is_empty()));
        assert_eq!(outcome.next_field.as_deref(), Some("form_filler_type"));
        assert!(!outcome.complete);
    }

    #[test]
    fn filled_field_is_never_asked_again_across_unrelated_merges() {
        let tracker = CompletionTracker::new(preset::admissions());
        let mut outcome = tracker.apply_turn(&record(&[]), &record(&[("student_name", "Meera")]));

        for (key, value) in [
            ("location", "Pune"),
            ("school_name", "DPS"),
            ("phone_number", "98765"),
            ("unrelated", "noise"),
        ] {
            outcome = tracker.apply_turn(&outcome.record, &record(&[(key, value)]));
            assert_ne!(outcome.next_field.as_deref(), Some("student_name"));
            assert!(!outcome.missing_fields.iter().any(|name| name == "student_name"));
        }
        assert_eq!(outcome.record.get("student_name").map(String::as_str), Some("Meera"));
    }

    #[test]
    fn student_respondent_completes_without_parent_name() {
        let tracker = CompletionTracker::new(preset::admissions());
        let filled = record(&[
            ("form_filler_type", "Student"),
            ("student_name", "Meera"),
            ("current_grade", "Grade 11"),
            ("phone_number", "98765"),
            ("parent_email", "meera@example.com"),
            ("location", "Pune"),
            ("curriculum_type", "CBSE"),
            ("school_name", "DPS"),
            ("target_geographies", "USA"),
            ("scholarship_requirement", "Partial"),
        ]);

        let outcome = tracker.apply_turn(&DataRecord::new(), &filled);
        assert!(outcome.complete);
        assert_eq!(outcome.next_field, None);
        assert_eq!(outcome.record.get("parent_name").map(String::as_str), Some(""));

        let as_parent =
            tracker.apply_turn(&outcome.record, &record(&[("form_filler_type", "Parent")]));
        assert_eq!(as_parent.next_field.as_deref(), Some("parent_name"));
        assert!(!as_parent.complete);
    }

    #[test]
    fn skip_fill_writes_sentinel_only_while_skipped() {
        let tracker = CompletionTracker::new(
            FormDefinition::new(vec![
                FieldDefinition::new("form_filler_type", FieldType::String, ""),
                FieldDefinition::new("parent_name", FieldType::String, "")
                    .required_unless("form_filler_type", "Student")
                    .with_skip_fill("N/A"),
            ])
            .expect("valid form"),
        );

        let student = tracker.apply_turn(&record(&[]), &record(&[("form_filler_type", "Student")]));
        assert_eq!(student.record.get("parent_name").map(String::as_str), Some("N/A"));
        assert!(student.complete);

        let parent = tracker.apply_turn(&record(&[]), &record(&[("form_filler_type", "Parent")]));
        assert_eq!(parent.record.get("parent_name").map(String::as_str), Some(""));
        assert_eq!(parent.next_field.as_deref(), Some("parent_name"));
    }

    #[test]
    fn sentinel_is_cleared_when_respondent_type_changes() {
        let tracker = CompletionTracker::new(
            FormDefinition::new(vec![
                FieldDefinition::new("form_filler_type", FieldType::String, ""),
                FieldDefinition::new("parent_name", FieldType::String, "")
                    .required_when("form_filler_type", "Parent")
                    .with_skip_fill("N/A"),
            ])
            .expect("valid form"),
        );

        let student = tracker.apply_turn(&record(&[]), &record(&[("form_filler_type", "Student")]));
        assert_eq!(student.record.get("parent_name").map(String::as_str), Some("N/A"));

        let corrected =
            tracker.apply_turn(&student.record, &record(&[("form_filler_type", "Parent")]));
        assert_eq!(corrected.record.get("parent_name").map(String::as_str), Some(""));
        assert_eq!(corrected.next_field.as_deref(), Some("parent_name"));
    }

    #[test]
    fn skip_fill_never_overwrites_a_real_answer() {
        let tracker = CompletionTracker::new(
            FormDefinition::new(vec![
                FieldDefinition::new("kind", FieldType::String, ""),
                FieldDefinition::new("extra", FieldType::String, "")
                    .required_when("kind", "X")
                    .with_skip_fill("N/A"),
            ])
            .expect("valid form"),
        );

        let outcome =
            tracker.apply_turn(&record(&[("kind", "Y"), ("extra", "given")]), &record(&[]));
        assert_eq!(outcome.record.get("extra").map(String::as_str), Some("given"));
    }

    fn parent_name_form() -> CompletionTracker {
        CompletionTracker::new(
            FormDefinition::new(vec![
                FieldDefinition::new("form_filler_type", FieldType::String, ""),
                FieldDefinition::new("parent_name", FieldType::String, "")
                    .required_unless("form_filler_type", "Student")
                    .with_skip_fill("N/A"),
            ])
            .expect("valid form"),
        )
    }

    #[test]
    fn literal_sentinel_answer_is_kept_and_not_asked_again() {
        let tracker = parent_name_form();
        let mut outcome =
            tracker.apply_turn(&record(&[]), &record(&[("form_filler_type", "Parent")]));
        assert_eq!(outcome.next_field.as_deref(), Some("parent_name"));

        for _ in 0..3 {
            outcome = tracker.apply_turn(&outcome.record, &record(&[("parent_name", "N/A")]));
            assert_eq!(outcome.record.get("parent_name").map(String::as_str), Some("N/A"));
            assert_ne!(outcome.next_field.as_deref(), Some("parent_name"));
            assert!(outcome.complete);
        }

        let later = tracker.apply_turn(&outcome.record, &record(&[]));
        assert_eq!(later.record.get("parent_name").map(String::as_str), Some("N/A"));
        assert!(later.complete);
    }

    #[test]
    fn sentinel_supplied_with_the_discriminator_change_is_kept() {
        let tracker = parent_name_form();
        let student = tracker.apply_turn(&record(&[]), &record(&[("form_filler_type", "Student")]));
        assert_eq!(student.record.get("parent_name").map(String::as_str), Some("N/A"));

        let parent = tracker.apply_turn(
            &student.record,
            &record(&[("form_filler_type", "Parent"), ("parent_name", "N/A")]),
        );
        assert_eq!(parent.record.get("parent_name").map(String::as_str), Some("N/A"));
        assert!(parent.complete);
    }
}
