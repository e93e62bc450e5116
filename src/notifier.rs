//! Run-completion notification (spec.md §9 open question: SMTP is out of
//! scope for this crate). `Notifier` is the seam a host application wires
//! its own mail/webhook/paging integration into; [`NullNotifier`] is the
//! default so the orchestrator never has to special-case "no notifier
//! configured".

use crate::model::BackupResult;

pub trait Notifier: Send + Sync {
    fn notify(&self, result: &BackupResult);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _result: &BackupResult) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BackupStatus;
    use chrono::Utc;

    #[test]
    fn null_notifier_does_not_panic() {
        let result = BackupResult {
            backup_id: "x".into(),
            status: BackupStatus::Success,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            artifacts: vec![],
            errors: vec![],
            validations: vec![],
        };
        NullNotifier.notify(&result);
    }
}
