//! `storage` root: bulk copy and move between storage locations.

use super::{ops_failed, Services};
use async_trait::async_trait;
use command_tree::{Args, ExecContext, Group, Handler, HandlerResult, Leaf, ParamSpec, ValueType};
use ops_client::{OpsClient, TransferRequest};
use tracing::info;

/// Process-wide override of the default thread count.
pub const STORAGE_THREADS_ENV: &str = "CV_STORAGE_THREADS";

pub(crate) fn group(services: &Services) -> Group {
    Group::new("storage")
        .describe("Subset of storage functionality: copy and move files between locations.")
        .param(
            ParamSpec::option("n_threads", Some('n'))
                .value_type(ValueType::Int)
                .default_env(STORAGE_THREADS_ENV, Some(services.storage_threads.to_string()))
                .help("Number of threads to perform the operation."),
        )
        .child(
            Leaf::new("copy", Transfer::new(services.ops.clone(), false))
                .describe(
                    "Copy from source to destination.\n\
                     Paths may use any protocol supported by the storage service.",
                )
                .param(ParamSpec::argument("src_path"))
                .param(ParamSpec::argument("dst_path")),
        )
        .child(
            Leaf::new("move", Transfer::new(services.ops.clone(), true))
                .describe(
                    "Move from source to destination.\n\
                     Warning: this deletes the files in SRC_PATH.",
                )
                .param(ParamSpec::argument("src_path"))
                .param(ParamSpec::argument("dst_path")),
        )
}

struct Transfer {
    ops: OpsClient,
    delete_source: bool,
}

impl Transfer {
    fn new(ops: OpsClient, delete_source: bool) -> Self {
        Self { ops, delete_source }
    }
}

#[async_trait]
impl Handler for Transfer {
    async fn call(&self, args: &Args, _ctx: &mut ExecContext) -> HandlerResult {
        let src = args.required_str("src_path")?;
        let dst = args.required_str("dst_path")?;
        let threads = args.required_int("n_threads")?;

        info!(%src, %dst, threads, delete_source = self.delete_source, "Starting transfer");
        let result = self
            .ops
            .transfer(&TransferRequest {
                src: src.to_string(),
                dst: dst.to_string(),
                threads,
                delete_source: self.delete_source,
            })
            .await
            .map_err(ops_failed)?;

        let verb = if self.delete_source { "Moved" } else { "Copied" };
        let mut reply = format!("{} files from `{}` to `{}`", verb, src, dst);
        if !result.message.is_empty() {
            reply.push('\n');
            reply.push_str(&result.message);
        }
        Ok(Some(reply))
    }
}
