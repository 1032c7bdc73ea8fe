// ── Snapshot store ──
//
// One current snapshot per lineage, replaced by reference. Readers load
// an `Arc` and never block; the refresher is the only writer.

mod lineage;
mod snapshot_store;
mod status;

pub use lineage::LineageStore;
pub use snapshot_store::SnapshotStore;
pub use status::RefreshStatus;
