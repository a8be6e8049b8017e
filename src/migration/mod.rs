// src/migration/mod.rs
//
// One-off data loading that runs outside the request path: the mock seed and
// the legacy SQL import. Both write in sequential batches through `transact`.

pub mod batch;
pub mod legacy;
pub mod sql_values;

pub use batch::{run_batches, MigrationReport};
pub use legacy::import_legacy;

use crate::config::MigrationConfig;
use crate::db::{transact, AdminDatabase, Upsert};
use crate::mock::Dataset;

/// Flattens a dataset into writes, parents first, so no batch depends on a
/// later one.
pub fn dataset_upserts(ds: Dataset) -> Vec<Upsert> {
    let mut ops = Vec::new();
    ops.extend(ds.users.into_iter().map(Upsert::User));
    ops.extend(ds.profiles.into_iter().map(Upsert::Profile));
    ops.extend(ds.relationships.into_iter().map(Upsert::Relationship));
    ops.extend(ds.batches.into_iter().map(Upsert::Batch));
    ops.extend(ds.requests.into_iter().map(Upsert::ChangeRequest));
    ops.extend(ds.participants.into_iter().map(Upsert::Participant));
    ops
}

pub fn write_in_batches(admin: &AdminDatabase, records: &[Upsert], cfg: &MigrationConfig) -> MigrationReport {
    run_batches(records, cfg.batch_size, cfg.batch_delay, |_, chunk| transact(admin, chunk))
}
