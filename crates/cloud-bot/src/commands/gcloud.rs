//! `gcloud` root: buckets, service accounts and their keys.

use super::{ops_failed, Services};
use crate::admin::Admins;
use async_trait::async_trait;
use command_tree::{
    Args, ExecContext, Group, Handler, HandlerError, HandlerResult, Leaf, ParamSpec,
};
use ops_client::{BucketRequest, KeyRequest, OpsClient, ServiceAccountRequest};
use std::sync::Arc;

/// Email of service account `name` in `project`. Full emails pass through.
pub fn sa_email(name: &str, project: &str) -> String {
    if name.contains('@') {
        name.to_string()
    } else {
        format!("{}@{}.iam.gserviceaccount.com", name, project)
    }
}

/// Full resource name of a service-account key.
pub fn key_name(project: &str, email: &str, key_id: &str) -> String {
    format!("projects/{}/serviceAccounts/{}/keys/{}", project, email, key_id)
}

fn project_option(services: &Services) -> ParamSpec {
    ParamSpec::option("project", Some('p'))
        .default_value(services.default_project.clone())
        .help("Project name.")
}

pub(crate) fn group(services: &Services) -> Group {
    let action = |op: Op| GcloudAction {
        op,
        ops: services.ops.clone(),
        admins: services.admins.clone(),
    };

    let keys = Group::new("keys")
        .describe("List keys of a service account. See help for sub commands.")
        .param(ParamSpec::argument("name"))
        .handler(action(Op::ListKeys))
        .child(Leaf::new("create", action(Op::CreateKey)).describe("Create a new key."))
        .child(
            Leaf::new("delete", action(Op::DeleteKey))
                .describe("Delete a key.")
                .param(ParamSpec::argument("key_id")),
        );

    let sa = Group::new("sa")
        .describe("List service accounts. See help for sub commands.")
        .param(project_option(services))
        .handler(action(Op::ListAccounts))
        .child(
            Leaf::new("create", action(Op::CreateAccount))
                .describe("Create a new service account.")
                .param(ParamSpec::argument("name"))
                .param(ParamSpec::argument("display_name")),
        )
        .child(
            Leaf::new("rename", action(Op::RenameAccount))
                .describe("Change service account display name.")
                .param(ParamSpec::argument("name"))
                .param(ParamSpec::argument("display_name")),
        )
        .child(
            Leaf::new("disable", action(Op::DisableAccount))
                .describe("Disable service account.")
                .param(ParamSpec::argument("name")),
        )
        .child(
            Leaf::new("enable", action(Op::EnableAccount))
                .describe("Enable service account.")
                .param(ParamSpec::argument("name")),
        )
        .child(
            Leaf::new("delete", action(Op::DeleteAccount))
                .describe("Delete service account.")
                .param(ParamSpec::argument("name")),
        )
        .child(keys);

    let bucket = Group::new("bucket")
        .describe("Bucket commands.")
        .child(
            Leaf::new("create", action(Op::CreateBucket))
                .describe("Create a new bucket.")
                .param(ParamSpec::argument("bucket_name")),
        );

    Group::new("gcloud")
        .describe("Type help gcloud <subcommand> for information.")
        .param(project_option(services))
        .child(bucket)
        .child(sa)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    CreateBucket,
    ListAccounts,
    CreateAccount,
    RenameAccount,
    DisableAccount,
    EnableAccount,
    DeleteAccount,
    ListKeys,
    CreateKey,
    DeleteKey,
}

impl Op {
    fn mutates(self) -> bool {
        !matches!(self, Op::ListAccounts | Op::ListKeys)
    }
}

struct GcloudAction {
    op: Op,
    ops: OpsClient,
    admins: Arc<Admins>,
}

#[async_trait]
impl Handler for GcloudAction {
    async fn call(&self, args: &Args, ctx: &mut ExecContext) -> HandlerResult {
        if self.op.mutates() {
            self.admins.check(&ctx.user_id)?;
        }

        let project = args.required_str("project")?;
        if project.is_empty() {
            return Err(HandlerError::InvalidInput(
                "no project configured, pass --project".into(),
            ));
        }

        let reply = match self.op {
            Op::CreateBucket => {
                let bucket = args.required_str("bucket_name")?;
                self.ops
                    .create_bucket(&BucketRequest {
                        project: project.to_string(),
                        bucket: bucket.to_string(),
                    })
                    .await
                    .map_err(ops_failed)?;
                format!("{} created.", bucket)
            }
            Op::ListAccounts => {
                let accounts = self
                    .ops
                    .list_service_accounts(project)
                    .await
                    .map_err(ops_failed)?;
                if accounts.is_empty() {
                    format!("No service accounts in `{}`.", project)
                } else {
                    let emails: Vec<&str> = accounts.iter().map(|a| a.email.as_str()).collect();
                    format!("```{}```", emails.join("\n"))
                }
            }
            Op::CreateAccount => {
                let account = self
                    .ops
                    .create_service_account(&account_request(args, project, true)?)
                    .await
                    .map_err(ops_failed)?;
                format!("Service account `{}` created.", account.email)
            }
            Op::RenameAccount => {
                let renamed = self
                    .ops
                    .rename_service_account(&account_request(args, project, true)?)
                    .await
                    .map_err(ops_failed)?;
                format!(
                    "Updated display name of `{}` from `{}` to `{}`",
                    renamed.email, renamed.old_display_name, renamed.display_name
                )
            }
            Op::DisableAccount | Op::EnableAccount => {
                let request = account_request(args, project, false)?;
                let enabled = self.op == Op::EnableAccount;
                self.ops
                    .set_service_account_enabled(&request, enabled)
                    .await
                    .map_err(ops_failed)?;
                let state = if enabled { "enabled" } else { "disabled" };
                format!("Service account `{}` {}.", request.email, state)
            }
            Op::DeleteAccount => {
                let request = account_request(args, project, false)?;
                self.ops
                    .delete_service_account(&request)
                    .await
                    .map_err(ops_failed)?;
                format!("Service account `{}` deleted.", request.email)
            }
            Op::ListKeys => {
                let keys = self
                    .ops
                    .list_keys(&key_request(args, project, None)?)
                    .await
                    .map_err(ops_failed)?;
                let lines: Vec<String> = keys
                    .iter()
                    .map(|k| format!("{} ({})", k.name, k.key_type))
                    .collect();
                format!("```{}```", lines.join("\n"))
            }
            Op::CreateKey => {
                let key = self
                    .ops
                    .create_key(&key_request(args, project, None)?)
                    .await
                    .map_err(ops_failed)?;
                let id = key.name.rsplit('/').next().unwrap_or(&key.name);
                format!(
                    "Key created `{}`.\nAvailable <{}|here> (link valid for 60s).",
                    id, key.url
                )
            }
            Op::DeleteKey => {
                let key_id = args.required_str("key_id")?;
                let request = key_request(args, project, Some(key_id))?;
                self.ops.delete_key(&request).await.map_err(ops_failed)?;
                format!(
                    "Deleted {}.",
                    request.key_name.as_deref().unwrap_or(key_id)
                )
            }
        };
        Ok(Some(reply))
    }
}

fn account_request(
    args: &Args,
    project: &str,
    with_display_name: bool,
) -> Result<ServiceAccountRequest, HandlerError> {
    let display_name = if with_display_name {
        Some(args.required_str("display_name")?.to_string())
    } else {
        None
    };
    Ok(ServiceAccountRequest {
        project: project.to_string(),
        email: sa_email(args.required_str("name")?, project),
        display_name,
    })
}

fn key_request(
    args: &Args,
    project: &str,
    key_id: Option<&str>,
) -> Result<KeyRequest, HandlerError> {
    let email = sa_email(args.required_str("name")?, project);
    Ok(KeyRequest {
        project: project.to_string(),
        key_name: key_id.map(|id| key_name(project, &email, id)),
        email,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{context, services, ADMIN};
    use super::*;
    use crate::admin::PERMISSION_DENIED;
    use crate::envelope::run;
    use command_tree::CommandTree;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, CommandTree) {
        let ops = MockServer::start().await;
        let slack = MockServer::start().await;
        let mut tree = CommandTree::new();
        tree.register(group(&services(&ops, &slack))).unwrap();
        (ops, tree)
    }

    #[test]
    fn test_sa_email() {
        assert_eq!(sa_email("bot", "demo"), "bot@demo.iam.gserviceaccount.com");
        assert_eq!(sa_email("x@other.com", "demo"), "x@other.com");
        assert_eq!(
            key_name("demo", "bot@demo.iam.gserviceaccount.com", "abc"),
            "projects/demo/serviceAccounts/bot@demo.iam.gserviceaccount.com/keys/abc"
        );
    }

    #[tokio::test]
    async fn test_sa_group_lists_accounts() {
        let (ops, tree) = setup().await;
        Mock::given(method("POST"))
            .and(path("/v1/operations/sa.list"))
            .and(body_json(serde_json::json!({ "project": "other" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accounts": [
                    { "email": "a@other.iam.gserviceaccount.com" },
                    { "email": "b@other.iam.gserviceaccount.com" }
                ]
            })))
            .expect(1)
            .mount(&ops)
            .await;

        let (mut ctx, _) = context("U1");
        let outcome = run(&tree, "gcloud sa -p other", &mut ctx).await;
        assert_eq!(
            outcome.text.as_deref(),
            Some("```a@other.iam.gserviceaccount.com\nb@other.iam.gserviceaccount.com```")
        );
    }

    #[tokio::test]
    async fn test_mutations_need_admin() {
        let (ops, tree) = setup().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&ops)
            .await;

        for cmd in [
            "gcloud sa create bot Bot",
            "gcloud sa delete bot",
            "gcloud sa keys bot create",
            "gcloud bucket create b1",
        ] {
            let (mut ctx, _) = context("UNOBODY");
            let text = run(&tree, cmd, &mut ctx).await.text.unwrap();
            assert!(text.contains(PERMISSION_DENIED), "{cmd}: {text}");
        }
    }

    #[tokio::test]
    async fn test_create_account_as_admin() {
        let (ops, tree) = setup().await;
        Mock::given(method("POST"))
            .and(path("/v1/operations/sa.create"))
            .and(body_json(serde_json::json!({
                "project": "demo",
                "email": "bot@demo.iam.gserviceaccount.com",
                "display_name": "Bot"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "bot@demo.iam.gserviceaccount.com"
            })))
            .expect(1)
            .mount(&ops)
            .await;

        let (mut ctx, _) = context(ADMIN);
        let outcome = run(&tree, "gcloud sa create bot Bot", &mut ctx).await;
        assert_eq!(
            outcome.text.as_deref(),
            Some("Service account `bot@demo.iam.gserviceaccount.com` created.")
        );
    }

    #[tokio::test]
    async fn test_root_project_reaches_nested_leaf() {
        let (ops, tree) = setup().await;
        Mock::given(method("POST"))
            .and(path("/v1/operations/sa.keys.delete"))
            .and(body_partial_json(serde_json::json!({
                "key_name": "projects/p2/serviceAccounts/bot@p2.iam.gserviceaccount.com/keys/k1"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "message": "" })),
            )
            .expect(1)
            .mount(&ops)
            .await;

        let (mut ctx, _) = context(ADMIN);
        let outcome = run(&tree, "gcloud -p p2 sa keys bot delete k1", &mut ctx).await;
        assert_eq!(
            outcome.text.as_deref(),
            Some("Deleted projects/p2/serviceAccounts/bot@p2.iam.gserviceaccount.com/keys/k1.")
        );
    }

    #[tokio::test]
    async fn test_list_keys() {
        let (ops, tree) = setup().await;
        Mock::given(method("POST"))
            .and(path("/v1/operations/sa.keys.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [{ "name": "projects/demo/serviceAccounts/bot/keys/k1", "keyType": "USER_MANAGED" }]
            })))
            .mount(&ops)
            .await;

        let (mut ctx, _) = context("U1");
        let outcome = run(&tree, "gcloud sa keys bot", &mut ctx).await;
        assert_eq!(
            outcome.text.as_deref(),
            Some("```projects/demo/serviceAccounts/bot/keys/k1 (USER_MANAGED)```")
        );
    }
}
