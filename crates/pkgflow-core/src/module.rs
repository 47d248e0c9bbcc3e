//! Registration units.
//!
//! A module contributes top-level action trees plus the step callables
//! implementing its leaves. Leaf actions are matched to callables by name
//! within their owning module.

use crate::action::ActionDef;
use crate::step::Step;
use indexmap::IndexMap;

#[derive(Debug)]
pub struct Module {
    name: String,
    actions: Vec<ActionDef>,
    steps: IndexMap<String, Step>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            steps: IndexMap::new(),
        }
    }

    pub fn action(mut self, action: ActionDef) -> Self {
        self.actions.push(action);
        self
    }

    /// Register a callable. A later step with the same name replaces it.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.insert(step.name().to_string(), step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[ActionDef] {
        &self.actions
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub(crate) fn into_parts(self) -> (String, Vec<ActionDef>, IndexMap<String, Step>) {
        (self.name, self.actions, self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Signal;

    #[test]
    fn later_step_replaces_earlier() {
        let module = Module::new("dist")
            .action(ActionDef::leaf("clone"))
            .step(Step::new("clone", |_| Ok(Signal::done())))
            .step(Step::new("clone", |_| Ok(Signal::finish("replaced"))).param("package"));

        assert_eq!(module.step_names().collect::<Vec<_>>(), ["clone"]);
        assert_eq!(module.actions().len(), 1);
        let (_, _, steps) = module.into_parts();
        assert_eq!(steps["clone"].params().len(), 1);
    }
}
