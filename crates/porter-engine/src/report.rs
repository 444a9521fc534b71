use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use porter_types::ObjectType;

/// Counters for one object type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReport {
    /// Records the source produced.
    pub exported: u64,
    /// Records the sink accepted.
    pub imported: u64,
    /// Malformed source rows.
    pub skipped_rows: u64,
    /// Records the sink declined.
    pub declined: u64,
    /// References replaced by their fallback.
    pub unresolved_references: u64,
    /// Asset records skipped because their file was unavailable.
    pub missing_files: u64,
    /// Users imported with the unresolved credential marker.
    pub unresolved_credentials: u64,
    /// Non-canonical fields dropped during normalization.
    pub dropped_fields: u64,
}

impl AddAssign for TypeReport {
    fn add_assign(&mut self, other: Self) {
        self.exported += other.exported;
        self.imported += other.imported;
        self.skipped_rows += other.skipped_rows;
        self.declined += other.declined;
        self.unresolved_references += other.unresolved_references;
        self.missing_files += other.missing_files;
        self.unresolved_credentials += other.unresolved_credentials;
        self.dropped_fields += other.dropped_fields;
    }
}

/// Outcome of one [`Migration::run`](crate::Migration::run) call.
///
/// Counts cover this call only; a resumed run reports what it did itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub queue: Vec<ObjectType>,
    pub types: BTreeMap<ObjectType, TypeReport>,
    /// Types completed by an earlier call and skipped by this one.
    pub resumed_past: Vec<ObjectType>,
    /// The run stopped between chunks before finishing.
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new(run_id: Uuid, queue: Vec<ObjectType>) -> Self {
        Self {
            run_id,
            queue,
            types: BTreeMap::new(),
            resumed_past: Vec::new(),
            interrupted: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn get(&self, object_type: ObjectType) -> TypeReport {
        self.types.get(&object_type).copied().unwrap_or_default()
    }

    pub fn entry(&mut self, object_type: ObjectType) -> &mut TypeReport {
        self.types.entry(object_type).or_default()
    }

    pub fn totals(&self) -> TypeReport {
        let mut total = TypeReport::default();
        for report in self.types.values() {
            total += *report;
        }
        total
    }

    pub(crate) fn finish(&mut self, interrupted: bool) {
        self.interrupted = interrupted;
        self.finished_at = Some(Utc::now());
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run {}{}",
            self.run_id,
            if self.interrupted { " (interrupted)" } else { "" }
        )?;
        for ty in &self.queue {
            if self.resumed_past.contains(ty) {
                writeln!(f, "  {:<26} done earlier", ty.as_str())?;
                continue;
            }
            let Some(r) = self.types.get(ty) else {
                writeln!(f, "  {:<26} not started", ty.as_str())?;
                continue;
            };
            write!(f, "  {:<26} {}/{} imported", ty.as_str(), r.imported, r.exported)?;
            for (label, n) in [
                ("skipped", r.skipped_rows),
                ("declined", r.declined),
                ("unresolved refs", r.unresolved_references),
                ("missing files", r.missing_files),
                ("password resets", r.unresolved_credentials),
            ] {
                if n > 0 {
                    write!(f, ", {n} {label}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_every_type() {
        let mut report = RunReport::new(Uuid::now_v7(), vec![ObjectType::User, ObjectType::Board]);
        report.entry(ObjectType::User).imported = 3;
        report.entry(ObjectType::User).unresolved_credentials = 1;
        report.entry(ObjectType::Board).imported = 2;
        report.entry(ObjectType::Board).missing_files = 4;
        let totals = report.totals();
        assert_eq!(totals.imported, 5);
        assert_eq!(totals.missing_files, 4);
        assert_eq!(report.get(ObjectType::Post), TypeReport::default());
    }

    #[test]
    fn display_lists_queue() {
        let mut report = RunReport::new(
            Uuid::nil(),
            vec![ObjectType::UserGroup, ObjectType::User, ObjectType::Board],
        );
        report.resumed_past.push(ObjectType::UserGroup);
        let user = report.entry(ObjectType::User);
        user.exported = 3;
        user.imported = 2;
        user.declined = 1;
        report.finish(true);

        let text = report.to_string();
        assert!(text.starts_with("run 00000000-0000-0000-0000-000000000000 (interrupted)\n"));
        assert!(text.contains("user.group"));
        assert!(text.contains("done earlier"));
        assert!(text.contains("2/3 imported, 1 declined"));
        assert!(text.contains("not started"));
        assert!(report.finished_at.is_some());
    }
}
