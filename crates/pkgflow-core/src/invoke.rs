//! Argument binding and step invocation.

use crate::action::ActionDef;
use crate::catalog::Catalog;
use crate::error::{FlowError, Result};
use crate::params::ParamBag;
use crate::step::{BoundArgs, Signal, Step};
use tracing::debug;

/// Match `step`'s declared parameters against `args`, in declaration order.
/// A parameter missing from `args` takes its default; without one the
/// binding fails.
pub fn bind(action: &ActionDef, step: &Step, args: &ParamBag) -> Result<BoundArgs> {
    let mut bound = BoundArgs::default();
    for param in step.params() {
        let value = match (args.get(&param.name), &param.default) {
            (Some(v), _) => v.clone(),
            (None, Some(default)) => default.clone(),
            (None, None) => {
                return Err(FlowError::RequiredActionArgumentNotAvailable {
                    action: action.name.clone(),
                    arg: param.name.clone(),
                })
            }
        };
        bound.push(&param.name, value);
    }
    Ok(bound)
}

/// Run the leaf `action` against `args`.
///
/// The action's constants are merged into `args` first and stay there. The
/// returned signal is not applied to `args`; that is the runner's job.
pub fn invoke(catalog: &Catalog, action: &ActionDef, args: &mut ParamBag) -> Result<Signal> {
    let step = catalog
        .resolve_callable(action)
        .ok_or_else(|| FlowError::ActionFunctionNotAvailable {
            action: action.name.clone(),
            module: action.module_name().to_string(),
        })?;

    args.merge(action.const_params.clone());
    let bound = bind(action, step, args)?;
    debug!(action = %action.name, args = bound.len(), "invoking step");

    step.call(&bound).map_err(|e| FlowError::StepFailed {
        action: action.name.clone(),
        message: format!("{e:#}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
