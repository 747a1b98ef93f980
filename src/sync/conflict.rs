//! Status comparison and conflict resolution between the two sides.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::config::ConflictPolicy;
use crate::model::{RemoteStatus, TaskStatus};

/// One of the two synchronized systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The task source.
    Sde,
    /// The ALM tool.
    Alm,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sde => "SDE",
            Self::Alm => "ALM",
        })
    }
}

/// Outcome of resolving a status conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Side whose status is kept.
    pub winner: Side,
    /// Status both sides end up with, on the task-source domain.
    pub new_status: TaskStatus,
}

impl Resolution {
    /// The side that has to be updated.
    #[must_use]
    pub fn loser(&self) -> Side {
        match self.winner {
            Side::Sde => Side::Alm,
            Side::Alm => Side::Sde,
        }
    }
}

/// Returns `true` when both sides agree on done / not done.
///
/// `DONE` and `NA` both count as done on the task-source side.
#[must_use]
pub fn status_match(remote: RemoteStatus, sde: TaskStatus) -> bool {
    sde.is_done() == (remote == RemoteStatus::Done)
}

/// Picks the winning side for a mismatched task.
///
/// With [`ConflictPolicy::Timestamp`] the task source wins only when it
/// changed strictly later than the remote item.
#[must_use]
pub fn resolve(
    sde_status: TaskStatus,
    sde_updated: DateTime<Utc>,
    remote_status: RemoteStatus,
    remote_updated: DateTime<Utc>,
    policy: ConflictPolicy,
) -> Resolution {
    let winner = match policy {
        ConflictPolicy::Alm => Side::Alm,
        ConflictPolicy::Sde => Side::Sde,
        ConflictPolicy::Timestamp => {
            if sde_updated > remote_updated {
                Side::Sde
            } else {
                Side::Alm
            }
        }
    };
    let new_status = match winner {
        Side::Sde => sde_status,
        Side::Alm => remote_status.to_task_status(),
    };
    Resolution { winner, new_status }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn resolution(winner: Side, new_status: TaskStatus) -> Resolution {
        Resolution { winner, new_status }
    }

    #[test]
    fn status_match_truth_table() {
        let cases = [
            (TaskStatus::Todo, RemoteStatus::Todo, true),
            (TaskStatus::Todo, RemoteStatus::Done, false),
            (TaskStatus::Done, RemoteStatus::Todo, false),
            (TaskStatus::Done, RemoteStatus::Done, true),
            (TaskStatus::Na, RemoteStatus::Todo, false),
            (TaskStatus::Na, RemoteStatus::Done, true),
        ];
        for (sde, remote, expected) in cases {
            assert_eq!(
                status_match(remote, sde),
                expected,
                "sde={sde} remote={remote}"
            );
        }
    }

    #[test]
    fn alm_policy_takes_remote_status() {
        let r = resolve(
            TaskStatus::Done,
            at(100),
            RemoteStatus::Todo,
            at(50),
            ConflictPolicy::Alm,
        );
        assert_eq!(r, resolution(Side::Alm, TaskStatus::Todo));
        assert_eq!(r.loser(), Side::Sde);
    }

    #[test]
    fn sde_policy_keeps_sde_status() {
        let r = resolve(
            TaskStatus::Na,
            at(10),
            RemoteStatus::Todo,
            at(50),
            ConflictPolicy::Sde,
        );
        assert_eq!(r, resolution(Side::Sde, TaskStatus::Na));
        assert_eq!(r.loser(), Side::Alm);
    }

    #[test]
    fn timestamp_policy_prefers_newer_sde() {
        let r = resolve(
            TaskStatus::Done,
            at(100),
            RemoteStatus::Todo,
            at(50),
            ConflictPolicy::Timestamp,
        );
        assert_eq!(r, resolution(Side::Sde, TaskStatus::Done));
    }

    #[test]
    fn timestamp_policy_prefers_newer_remote() {
        let r = resolve(
            TaskStatus::Todo,
            at(10),
            RemoteStatus::Done,
            at(50),
            ConflictPolicy::Timestamp,
        );
        assert_eq!(r, resolution(Side::Alm, TaskStatus::Done));
    }

    #[test]
    fn timestamp_tie_goes_to_alm() {
        let r = resolve(
            TaskStatus::Done,
            at(50),
            RemoteStatus::Todo,
            at(50),
            ConflictPolicy::Timestamp,
        );
        assert_eq!(r.winner, Side::Alm);
        assert_eq!(r.new_status, TaskStatus::Todo);
    }
}
