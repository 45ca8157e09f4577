//! The reconciliation entry point.
//!
//! One invocation diffs the whole device: per-app plans first, then the
//! cross-app pass, then a trailing image sweep once nothing else is pending.
//! The result is a batch of steps that are individually safe and may be
//! executed in any order; anything that must happen strictly later is left
//! for a future invocation to emit.

use std::collections::BTreeSet;

use tracing::debug;

use crate::app::App;
use crate::context::Context;
use crate::step::Step;

pub(crate) mod app;
pub(crate) mod cross;

/// Computes the next batch of composition steps taking `current` toward
/// `target`.
///
/// Pure and deterministic: same inputs, same batch. Returns `[]` once the
/// fixpoint is reached and `[Noop]` when progress is blocked on in-flight
/// downloads.
pub fn next_steps(current: &[App], target: &[App], ctx: &Context) -> Vec<Step> {
    let mut steps = Vec::new();
    for tgt in target {
        let cur = current.iter().find(|app| app.app_id == tgt.app_id);
        steps.extend(app::plan_app(cur, tgt, ctx));
    }
    steps.extend(cross::plan(current, target, ctx));

    let mut steps = dedupe(steps);

    if steps.iter().all(Step::is_noop) {
        steps.extend(cross::image_cleanup(current, target, ctx));
    }

    if steps.is_empty() && !ctx.downloading.is_empty() {
        steps.push(Step::Noop);
    }

    if !steps.is_empty() {
        let actions: Vec<&str> = steps.iter().map(Step::action).collect();
        debug!(count = steps.len(), ?actions, "planned composition steps");
    }
    steps
}

/// Drops steps whose identity already appeared earlier in the batch; two
/// sources legitimately ask for the same mutation (a volume recreation and a
/// config change both killing one service, two services sharing an image).
fn dedupe(steps: Vec<Step>) -> Vec<Step> {
    let mut seen = BTreeSet::new();
    steps
        .into_iter()
        .filter(|step| seen.insert(step.identity()))
        .collect()
}
