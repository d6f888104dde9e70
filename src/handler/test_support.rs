use crate::config::ImporterProperties;
use crate::domain::EntityId;
use crate::record::RecordItem;
use crate::resolver::NoopEntityIdResolver;
use crate::runtime::Projector;
use crate::sink::InMemoryLedger;

/// Projects one record with default properties into a fresh ledger.
pub(crate) fn project(item: RecordItem) -> (RecordItem, InMemoryLedger) {
    project_with(ImporterProperties::default(), item)
}

pub(crate) fn project_with(
    properties: ImporterProperties,
    mut item: RecordItem,
) -> (RecordItem, InMemoryLedger) {
    let projector = Projector::new(properties).unwrap();
    let mut ledger = InMemoryLedger::new();
    projector
        .process(&mut item, &NoopEntityIdResolver, &mut ledger)
        .unwrap();
    (item, ledger)
}

pub(crate) fn touched(item: &RecordItem) -> Vec<EntityId> {
    item.entity_ids().iter().copied().collect()
}

pub(crate) fn ids(nums: &[i64]) -> Vec<EntityId> {
    nums.iter().map(|&num| EntityId::of(num)).collect()
}
