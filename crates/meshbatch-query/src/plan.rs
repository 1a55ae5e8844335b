//! The recursive plan-node tree (spec §4.G).

use crate::context::QueryPlanContext;
use futures::stream::BoxStream;
use meshbatch_core::client::ClientError;
use meshbatch_core::error::MeshError;
use meshbatch_core::value::QueryRow;

/// If `err` is an expired-auth failure, invalidates `identity` in `ctx`'s registry (spec §7
/// propagation policy: "Auth-expired errors invalidate the affected identity in the registry
/// before surfacing"). A no-op when the context has no registered registry or `err` is some
/// other variant.
pub async fn invalidate_on_auth_expired(ctx: &QueryPlanContext, err: &ClientError, identity: &str) {
    if matches!(err, ClientError::AuthExpired) {
        if let Some(registry) = ctx.registry() {
            registry.invalidate_identity(identity).await;
        }
    }
}

/// A lazy, cancellable, single-use sequence of rows (spec §4.G).
pub type RowStream<'a> = BoxStream<'a, Result<QueryRow, MeshError>>;

/// Every leaf scan and transform node in the plan tree implements this.
///
/// Nodes are single-use producers: `execute` consumes `&self` logically even though the
/// signature only borrows, because the returned stream owns whatever per-enumeration state it
/// needs. A caller that wants a second enumeration reconstructs the tree.
pub trait PlanNode: Send + Sync {
    /// A human-readable description, e.g. `"RemoteScan(SELECT name FROM account)"`.
    fn description(&self) -> String;

    /// Estimated row count, or `-1` if unknown.
    fn estimated_rows(&self) -> i64 {
        -1
    }

    /// Child nodes, for plan visualization and cost estimation.
    fn children(&self) -> Vec<&dyn PlanNode> {
        Vec::new()
    }

    /// Produces this node's rows against `ctx`.
    fn execute<'a>(&'a self, ctx: &'a QueryPlanContext) -> RowStream<'a>;
}

/// Maps a [`ClientError`] surfaced mid-enumeration to the stable taxonomy a plan consumer sees
/// (spec §7; aggregate-limit detection is already a tagged variant, not text matching — spec §9
/// "Exception-for-control-flow").
/// Turns a [`MeshError`] into a `Result<(), _>` so it can be used with `?` inside an
/// `async_stream::try_stream!` block where no other Result in scope pins the Ok type.
pub fn fail(err: MeshError) -> Result<(), MeshError> {
    Err(err)
}

pub fn map_client_error(err: ClientError, identity: &str) -> MeshError {
    match err {
        ClientError::Throttled(retry_after) => MeshError::Throttled { retry_after },
        ClientError::Transient(message) => MeshError::Transient { message },
        ClientError::AuthExpired => MeshError::AuthExpired { identity: identity.to_string() },
        ClientError::Fatal(message) => MeshError::Fatal { message },
        ClientError::AggregateLimitExceeded { limit } => MeshError::AggregateLimitExceeded { limit },
    }
}
