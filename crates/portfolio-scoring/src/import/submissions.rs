use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use super::ImportError;
use crate::portfolio::{ProviderError, Submission, SubmissionId, SubmissionProvider};

/// Submissions read from a JSON array. Only the latest version of each id is served.
#[derive(Debug, Clone, Default)]
pub struct SubmissionArchive {
    latest: HashMap<SubmissionId, Submission>,
}

impl SubmissionArchive {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ImportError> {
        let submissions: Vec<Submission> = serde_json::from_reader(reader)?;
        Ok(Self::from_submissions(submissions))
    }

    pub fn from_submissions(submissions: Vec<Submission>) -> Self {
        let mut latest: HashMap<SubmissionId, Submission> = HashMap::new();
        for submission in submissions {
            let newer = latest
                .get(&submission.id)
                .map_or(true, |current| submission.version > current.version);
            if newer {
                latest.insert(submission.id.clone(), submission);
            }
        }
        Self { latest }
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

impl SubmissionProvider for SubmissionArchive {
    fn submission(&self, id: &SubmissionId) -> Result<Option<Submission>, ProviderError> {
        Ok(self.latest.get(id).cloned())
    }
}
