// ── Bulk job table ──
//
// In-memory records of submitted bulk updates, keyed by job id. Records
// live for the lifetime of the process.

use chrono::Utc;
use dashmap::DashMap;

use crate::model::{DeviceTarget, JobId, JobRecord, JobState, Outcome};

#[derive(Default)]
pub struct JobTable {
    records: DashMap<JobId, JobRecord>,
}

impl JobTable {
    /// Register a batch that is about to start.
    pub fn insert(
        &self,
        id: JobId,
        targets: Vec<DeviceTarget>,
        template_version: Option<u64>,
    ) -> JobRecord {
        let record = JobRecord {
            id,
            state: JobState::Running,
            submitted_at: Utc::now(),
            finished_at: None,
            template_version,
            targets,
            outcomes: Vec::new(),
        };
        self.records.insert(id, record.clone());
        record
    }

    /// Record the outcomes of a finished batch. Returns `false` for an
    /// unknown id.
    pub fn complete(&self, id: JobId, outcomes: Vec<Outcome>) -> bool {
        let Some(mut record) = self.records.get_mut(&id) else {
            return false;
        };
        record.outcomes = outcomes;
        record.state = JobState::Completed;
        record.finished_at = Some(Utc::now());
        true
    }

    pub fn get(&self, id: JobId) -> Option<JobRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::OutcomeStatus;

    #[test]
    fn job_lifecycle() {
        let table = JobTable::default();
        let id = JobId::new();
        let target = DeviceTarget::new("10.0.0.2", "Encoder-2");

        let record = table.insert(id, vec![target.clone()], Some(3));
        assert_eq!(record.state, JobState::Running);
        assert!(table.get(id).unwrap().finished_at.is_none());

        assert!(table.complete(id, vec![Outcome::new(&target, OutcomeStatus::Updated)]));
        let done = table.get(id).unwrap();
        assert_eq!(done.state, JobState::Completed);
        assert_eq!(done.updated_count(), 1);
        assert_eq!(done.template_version, Some(3));
        assert!(done.finished_at.is_some());
    }

    #[test]
    fn unknown_job() {
        let table = JobTable::default();
        assert!(table.get(JobId::new()).is_none());
        assert!(!table.complete(JobId::new(), Vec::new()));
        assert!(table.is_empty());
    }
}
