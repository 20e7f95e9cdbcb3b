//! Single-record sync commands, all executed as [`SyncJob`]s.

use super::{print_json, Context};
use crate::error::CliResult;
use clap::{Args, ValueEnum};
use ctct_core::{LocalId, RemoteId};
use ctct_sync::{RecordKind, SyncJob};

/// Record type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    List,
    CustomField,
    Contact,
    Campaign,
}

impl From<Kind> for RecordKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::List => Self::ContactList,
            Kind::CustomField => Self::CustomField,
            Kind::Contact => Self::Contact,
            Kind::Campaign => Self::EmailCampaign,
        }
    }
}

/// Arguments for commands addressing a stored record
#[derive(Args)]
pub struct LocalArgs {
    #[arg(value_enum)]
    pub kind: Kind,
    /// Local record id
    pub id: LocalId,
}

/// Arguments for the pull command
#[derive(Args)]
pub struct PullArgs {
    #[arg(value_enum)]
    pub kind: Kind,
    /// Constant Contact id of the resource
    pub api_id: RemoteId,
}

/// Arguments for the memberships command
#[derive(Args)]
pub struct MembershipsArgs {
    /// Local id of the contact list
    pub list_id: LocalId,
}

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Job as JSON, e.g. '{"job":"schedule_activity","campaign_id":"..."}'
    pub job: String,
}

pub fn push_job(args: &LocalArgs) -> SyncJob {
    SyncJob::Push {
        kind: args.kind.into(),
        id: args.id,
    }
}

pub fn pull_job(args: &PullArgs) -> SyncJob {
    SyncJob::Pull {
        kind: args.kind.into(),
        api_id: args.api_id,
    }
}

pub fn delete_job(args: &LocalArgs) -> SyncJob {
    SyncJob::Delete {
        kind: args.kind.into(),
        id: args.id,
    }
}

pub fn memberships_job(args: &MembershipsArgs) -> SyncJob {
    SyncJob::UpsertMemberships {
        list_id: args.list_id,
    }
}

pub fn parse_job(args: &RunArgs) -> CliResult<SyncJob> {
    Ok(serde_json::from_str(&args.job)?)
}

/// Run `job` and print its outcome.
pub async fn run(context: &Context, job: SyncJob) -> CliResult<()> {
    let outcome = context.manager().run_job(&job).await?;
    print_json(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_to_record_kind() {
        assert_eq!(RecordKind::from(Kind::List), RecordKind::ContactList);
        assert_eq!(RecordKind::from(Kind::Campaign), RecordKind::EmailCampaign);
    }

    #[test]
    fn test_parse_job() {
        let id = LocalId::new();
        let job = parse_job(&RunArgs {
            job: format!(r#"{{"job":"schedule_activity","campaign_id":"{id}"}}"#),
        })
        .unwrap();
        assert_eq!(job, SyncJob::ScheduleActivity { campaign_id: id });
    }

    #[test]
    fn test_parse_job_rejects_garbage() {
        assert!(parse_job(&RunArgs { job: "{}".into() }).is_err());
    }
}
