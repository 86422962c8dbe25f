//! `gt` root: ground-truth volume jobs. All of them run long and broadcast
//! their result.

use super::{ops_failed, Services};
use async_trait::async_trait;
use command_tree::{
    Args, ExecContext, Group, Handler, HandlerError, HandlerResult, Leaf, ParamSpec,
};
use ops_client::{CutoutRequest, OpsClient, StateRequest, VolumeRequest};
use slack_client::SlackClient;
use tracing::{debug, info};

/// Author recorded when the user's name cannot be looked up.
pub const FALLBACK_AUTHOR: &str = "cloud_bot_gtbot";

/// Lower-cased real name with spaces replaced by underscores.
pub async fn author_name(slack: &SlackClient, user_id: &str) -> String {
    match slack.user_info(user_id).await {
        Ok(user) => match user.display() {
            Some(name) => name.to_lowercase().replace(' ', "_"),
            None => FALLBACK_AUTHOR.into(),
        },
        Err(e) => {
            debug!("User lookup for {} failed: {}", user_id, e);
            FALLBACK_AUTHOR.into()
        }
    }
}

pub(crate) fn group(services: &Services) -> Group {
    let job = |kind: Job| VolumeJob {
        kind,
        ops: services.ops.clone(),
        slack: services.slack.clone(),
    };

    Group::new("gt").describe("Ground truth commands.").child(
        Group::new("volume")
            .describe("Perform actions on a given volume.")
            .child(
                Leaf::new("preview", job(Job::Preview))
                    .describe("Preview volume in a viewer. Takes a GCS path (gs://...) as input.")
                    .param(ParamSpec::argument("path")),
            )
            .child(
                Leaf::new("create_cutouts", job(Job::Cutouts))
                    .describe("Create a cutout of given volume(s). Takes a viewer link as input.")
                    .param(ParamSpec::argument("url")),
            )
            .child(
                Leaf::new("create_bboxes", job(Job::Bboxes))
                    .describe("Create a bbox of given volume(s). Takes a viewer link as input.")
                    .param(ParamSpec::argument("url")),
            ),
    )
}

#[derive(Debug, Clone, Copy)]
enum Job {
    Preview,
    Cutouts,
    Bboxes,
}

struct VolumeJob {
    kind: Job,
    ops: OpsClient,
    slack: SlackClient,
}

#[async_trait]
impl Handler for VolumeJob {
    async fn call(&self, args: &Args, ctx: &mut ExecContext) -> HandlerResult {
        ctx.long_job = true;
        ctx.broadcast = true;
        let author = author_name(&self.slack, &ctx.user_id).await;

        match self.kind {
            Job::Preview => {
                let path = args.required_str("path")?;
                let preview = self
                    .ops
                    .preview_volume(&VolumeRequest {
                        path: path.to_string(),
                        author,
                    })
                    .await
                    .map_err(ops_failed)?;
                Ok(Some(format!("Preview of `{}`: {}", path, preview.url)))
            }
            Job::Bboxes => {
                let url = args.required_str("url")?;
                let result = self
                    .ops
                    .create_bboxes(&StateRequest {
                        url: url.to_string(),
                        author,
                    })
                    .await
                    .map_err(ops_failed)?;
                Ok(Some(result.message))
            }
            Job::Cutouts => self.cutouts(args.required_str("url")?, author, ctx).await,
        }
    }
}

impl VolumeJob {
    /// Status updates go to the thread only; each finished cutout is broadcast.
    async fn cutouts(&self, url: &str, author: String, ctx: &mut ExecContext) -> HandlerResult {
        ctx.broadcast = false;
        ctx.progress("Parsing state from viewer link.").await;
        let state = self
            .ops
            .parse_state(&StateRequest {
                url: url.to_string(),
                author: author.clone(),
            })
            .await
            .map_err(ops_failed)?;

        if state.bboxes.is_empty() {
            ctx.progress("Did not find bounding box. Nothing to do.").await;
            return Ok(None);
        }
        let voxel_size = state
            .voxel_size
            .ok_or_else(|| HandlerError::InvalidInput(format!("Could not get voxelSize from {}", url)))?;

        ctx.progress("Parsed parameters, creating cutouts.").await;
        info!(count = state.bboxes.len(), %author, "Creating cutouts");

        ctx.broadcast = true;
        for bbox in state.bboxes {
            let result = self
                .ops
                .create_cutout(&CutoutRequest {
                    source: state.source.clone(),
                    destination: format!("{}/cutouts/{}", author, bbox.name),
                    bbox: bbox.bbox,
                    voxel_size: voxel_size.clone(),
                    author: author.clone(),
                })
                .await
                .map_err(ops_failed)?;
            ctx.progress(format!("```{}```", result.message)).await;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{context, services};
    use super::*;
    use crate::envelope::run;
    use command_tree::{CommandTree, Emission};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_user(slack: &MockServer, real_name: &str) {
        Mock::given(method("GET"))
            .and(path("/users.info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "user": { "id": "U1", "real_name": real_name }
            })))
            .mount(slack)
            .await;
    }

    #[tokio::test]
    async fn test_author_name() {
        let slack = MockServer::start().await;
        mock_user(&slack, "Ada Lovelace").await;
        let client = SlackClient::new(slack.uri(), "t", Duration::from_secs(5)).unwrap();
        assert_eq!(author_name(&client, "U1").await, "ada_lovelace");
    }

    #[tokio::test]
    async fn test_author_name_falls_back() {
        let slack = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&slack)
            .await;
        let client = SlackClient::new(slack.uri(), "t", Duration::from_secs(5)).unwrap();
        assert_eq!(author_name(&client, "U1").await, FALLBACK_AUTHOR);
    }

    #[tokio::test]
    async fn test_cutouts_progress_and_broadcasts() {
        let ops = MockServer::start().await;
        let slack = MockServer::start().await;
        mock_user(&slack, "Ada Lovelace").await;

        Mock::given(method("POST"))
            .and(path("/v1/operations/volume.parse_state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "source": "gs://vol/img",
                "voxelSize": [4.0, 4.0, 40.0],
                "bboxes": [
                    { "name": "a", "bbox": [0, 0, 0, 1, 1, 1] },
                    { "name": "b", "bbox": [2, 2, 2, 3, 3, 3] }
                ]
            })))
            .mount(&ops)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/operations/volume.cutout"))
            .and(body_partial_json(serde_json::json!({ "destination": "ada_lovelace/cutouts/a" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "message": "cut a" })))
            .expect(1)
            .mount(&ops)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/operations/volume.cutout"))
            .and(body_partial_json(serde_json::json!({ "destination": "ada_lovelace/cutouts/b" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "message": "cut b" })))
            .expect(1)
            .mount(&ops)
            .await;

        let mut tree = CommandTree::new();
        tree.register(group(&services(&ops, &slack))).unwrap();
        let (mut ctx, sink) = context("U1");
        let outcome = run(&tree, "gt volume create_cutouts https://viewer/#!{}", &mut ctx).await;

        assert_eq!(outcome.text, None);
        assert!(outcome.long_job);
        let emission = |text: &str, broadcast: bool| Emission {
            text: text.into(),
            long_job: true,
            broadcast,
        };
        assert_eq!(
            sink.emissions(),
            vec![
                emission("Parsing state from viewer link.", false),
                emission("Parsed parameters, creating cutouts.", false),
                emission("```cut a```", true),
                emission("```cut b```", true),
            ]
        );
    }

    #[tokio::test]
    async fn test_preview_is_long_and_broadcast() {
        let ops = MockServer::start().await;
        let slack = MockServer::start().await;
        mock_user(&slack, "Ada").await;
        Mock::given(method("POST"))
            .and(path("/v1/operations/volume.preview"))
            .and(body_partial_json(serde_json::json!({ "path": "gs://vol", "author": "ada" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": "https://viewer/#!preview"
            })))
            .expect(1)
            .mount(&ops)
            .await;

        let mut tree = CommandTree::new();
        tree.register(group(&services(&ops, &slack))).unwrap();
        let (mut ctx, _) = context("U1");
        let outcome = run(&tree, "gt volume preview gs://vol", &mut ctx).await;
        assert!(outcome.long_job);
        assert!(outcome.broadcast);
        assert_eq!(
            outcome.text.as_deref(),
            Some("Preview of `gs://vol`: https://viewer/#!preview")
        );
    }
}
