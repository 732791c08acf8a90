//! Property-based tests for schema mutations and value mapping.

use std::collections::HashSet;

use chrono::Utc;
use proptest::prelude::*;
use recordkit_fields::{
    from_label_keyed, to_label_keyed, EntityType, FieldChanges, FieldDefinition, FieldDraft,
    FieldId, FieldType, FieldValues, InMemoryFieldStore, SchemaService,
};

const MAX_FIELDS: usize = 8;
const ACTOR: &str = "prop";

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn definition(index: usize, label: &str) -> FieldDefinition {
    let now = Utc::now();
    FieldDefinition {
        id: FieldId::new(),
        entity_type: EntityType::Job,
        field_name: format!("Field_{}", index + 1),
        field_label: label.to_string(),
        field_type: FieldType::Text,
        is_required: false,
        is_hidden: false,
        is_read_only: false,
        sort_order: 0,
        options: Vec::new(),
        placeholder: None,
        default_value: None,
        lookup_type: None,
        sub_field_ids: Vec::new(),
        dependent_on_field_id: None,
        role: None,
        created_at: now,
        updated_at: now,
        created_by: ACTOR.to_string(),
        updated_by: ACTOR.to_string(),
    }
}

/// Invariants every stored schema must satisfy.
fn assert_invariants(defs: &[FieldDefinition]) {
    let mut names = HashSet::new();
    for def in defs {
        assert!(!(def.is_required && def.is_hidden), "{} required and hidden", def.field_name);
        assert!(!(def.is_read_only && def.is_required), "{} read-only and required", def.field_name);
        assert!(names.insert(def.field_name.as_str()), "duplicate {}", def.field_name);
        if let Some(target) = def.dependent_on_field_id {
            let target = defs.iter().find(|d| d.id == target).expect("dependency target exists");
            assert!(!target.is_hidden);
            assert!(!target.is_composite());
        }
        for sub in &def.sub_field_ids {
            let sub = defs.iter().find(|d| d.id == *sub).expect("sub-field exists");
            assert!(!sub.is_composite());
        }
    }
}

#[derive(Debug, Clone)]
enum Step {
    Create { required: bool, hidden: bool, read_only: bool, depends_on: Option<usize> },
    Flags { field: usize, required: Option<bool>, hidden: Option<bool>, read_only: Option<bool> },
    DependOn { field: usize, target: Option<usize> },
    Delete { field: usize },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (any::<bool>(), any::<bool>(), any::<bool>(), proptest::option::of(0..MAX_FIELDS)).prop_map(
            |(required, hidden, read_only, depends_on)| Step::Create {
                required,
                hidden,
                read_only,
                depends_on
            }
        ),
        (
            0..MAX_FIELDS,
            proptest::option::of(any::<bool>()),
            proptest::option::of(any::<bool>()),
            proptest::option::of(any::<bool>())
        )
            .prop_map(|(field, required, hidden, read_only)| Step::Flags {
                field,
                required,
                hidden,
                read_only
            }),
        (0..MAX_FIELDS, proptest::option::of(0..MAX_FIELDS))
            .prop_map(|(field, target)| Step::DependOn { field, target }),
        (0..MAX_FIELDS).prop_map(|field| Step::Delete { field }),
    ]
}

proptest! {
    #[test]
    fn mutations_never_break_invariants(steps in prop::collection::vec(step(), 1..24)) {
        runtime().block_on(async {
            let svc = SchemaService::new(InMemoryFieldStore::new());
            for step in steps {
                let defs = svc.list_fields(EntityType::Job).await.unwrap();
                let pick = |i: usize| defs.get(i % defs.len().max(1)).map(|d| d.id);
                // Typed rejections are fine; a result that breaks an invariant is not.
                let _ = match step {
                    Step::Create { required, hidden, read_only, depends_on } => {
                        let mut draft = FieldDraft::new("F", FieldType::Text)
                            .required(required)
                            .hidden(hidden)
                            .read_only(read_only);
                        if let Some(target) = depends_on.and_then(pick) {
                            draft = draft.depends_on(target);
                        }
                        svc.create_field(EntityType::Job, draft, ACTOR).await.map(|_| ())
                    }
                    Step::Flags { field, required, hidden, read_only } => {
                        let Some(id) = pick(field) else { continue };
                        let changes = FieldChanges {
                            is_required: required,
                            is_hidden: hidden,
                            is_read_only: read_only,
                            ..FieldChanges::default()
                        };
                        svc.update_field(&id, changes, ACTOR).await.map(|_| ())
                    }
                    Step::DependOn { field, target } => {
                        let Some(id) = pick(field) else { continue };
                        let changes = FieldChanges::new().depends_on(target.and_then(pick));
                        svc.update_field(&id, changes, ACTOR).await.map(|_| ())
                    }
                    Step::Delete { field } => {
                        let Some(id) = pick(field) else { continue };
                        svc.delete_field(&id, ACTOR).await.map(|_| ())
                    }
                };
                let defs = svc.list_fields(EntityType::Job).await.unwrap();
                assert_invariants(&defs);
            }
        });
    }

    #[test]
    fn reorder_twice_is_a_noop(
        count in 1..MAX_FIELDS,
        picks in prop::collection::vec(0..MAX_FIELDS + 3, 0..12),
    ) {
        runtime().block_on(async {
            let svc = SchemaService::new(InMemoryFieldStore::new());
            let mut ids = Vec::new();
            for _ in 0..count {
                let def = svc
                    .create_field(EntityType::Job, FieldDraft::new("F", FieldType::Text), ACTOR)
                    .await
                    .unwrap();
                ids.push(def.id);
            }
            // Indexes past the end stand in for unknown ids.
            let requested: Vec<FieldId> = picks
                .iter()
                .map(|&i| ids.get(i).copied().unwrap_or_else(FieldId::new))
                .collect();

            let first = svc.reorder_fields(EntityType::Job, &requested, ACTOR).await.unwrap();
            assert_eq!(first.len(), count);
            let produced: Vec<FieldId> = first.iter().map(|d| d.id).collect();
            let second = svc.reorder_fields(EntityType::Job, &produced, ACTOR).await.unwrap();
            assert_eq!(&second, &first);

            let listed: Vec<FieldId> = svc
                .list_fields(EntityType::Job)
                .await
                .unwrap()
                .iter()
                .map(|d| d.id)
                .collect();
            assert_eq!(listed, produced);
        });
    }

    #[test]
    fn label_keyed_round_trip(
        labels in prop::collection::vec(
            prop::sample::select(vec![
                "Name", "Email", "Notes", "", "Field_1", "Field_2", "Field_3",
            ]),
            1..MAX_FIELDS,
        ),
        present in prop::collection::vec(any::<bool>(), MAX_FIELDS),
        texts in prop::collection::vec("[a-z ]{0,12}", MAX_FIELDS),
    ) {
        let defs: Vec<FieldDefinition> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| definition(i, label))
            .collect();
        let values: FieldValues = defs
            .iter()
            .enumerate()
            .filter(|(i, _)| present[*i])
            .map(|(i, d)| (d.field_name.clone(), texts[i].clone().into()))
            .collect();

        let stored = to_label_keyed(&values, &defs);
        prop_assert_eq!(from_label_keyed(&stored, &defs), values);
    }
}
