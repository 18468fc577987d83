//! Structural validation of context files
//!
//! Validation is total: it never fails and returns every problem found,
//! addressed with the dotted/bracketed path of the offending field
//! (`scenarios[2].assertions[0].command`).

use std::collections::HashSet;
use std::fmt;

use super::duration::parse_duration;
use super::model::{Assertion, Context, Hook, OnFailure, RunBlock, Scenario};

const INVALID_ON_FAILURE: &str = "must be skip_children, continue, or abort_run";

/// A single structural problem in a context file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidationError {
    pub file: String,
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.file, self.path, self.message)
    }
}

struct Validator<'a> {
    file: &'a str,
    errors: Vec<ValidationError>,
}

impl Validator<'_> {
    fn add_error(&mut self, path: String, message: &str) {
        self.errors.push(ValidationError {
            file: self.file.to_string(),
            path,
            message: message.to_string(),
        });
    }

    fn check_on_failure(&mut self, value: &str, path: String) {
        if !value.is_empty() && OnFailure::parse(value).is_none() {
            self.add_error(path, INVALID_ON_FAILURE);
        }
    }

    fn check_timeout(&mut self, timeout: &str, path: String) {
        if !timeout.is_empty() && parse_duration(timeout).is_err() {
            self.add_error(path, "invalid duration");
        }
    }

    fn validate_hook(&mut self, hook: Option<&Hook>, path: &str) {
        let Some(hook) = hook else { return };
        if hook.run.is_empty() {
            self.add_error(format!("{path}.run"), "required");
        }
        self.check_timeout(&hook.timeout, format!("{path}.timeout"));
    }

    fn validate_run_block(&mut self, run: Option<&RunBlock>, path: &str) {
        let Some(run) = run else { return };
        if run.command.is_empty() {
            self.add_error(format!("{path}.command"), "required");
        }
        self.check_timeout(&run.timeout, format!("{path}.timeout"));
    }

    fn validate_assertion(&mut self, assertion: &Assertion, path: &str) {
        if assertion.command.is_empty() {
            self.add_error(format!("{path}.command"), "required");
        }
        self.check_timeout(&assertion.timeout, format!("{path}.timeout"));
    }

    fn validate_scenario(&mut self, scenario: &Scenario, path: &str) {
        if scenario.id.is_empty() {
            self.add_error(format!("{path}.id"), "required");
        }
        self.check_on_failure(&scenario.on_failure, format!("{path}.on_failure"));
        if scenario.run.is_some() && scenario.is_group() {
            self.add_error(format!("{path}.run"), "groups cannot have run blocks");
        }
        if scenario.is_leaf() && scenario.before_each.is_some() {
            self.add_error(
                format!("{path}.before_each"),
                "leaf scenarios cannot have before_each hooks",
            );
        }
        if scenario.is_leaf() && scenario.after_each.is_some() {
            self.add_error(
                format!("{path}.after_each"),
                "leaf scenarios cannot have after_each hooks",
            );
        }
        self.validate_hook(scenario.before.as_ref(), &format!("{path}.before"));
        self.validate_hook(scenario.after.as_ref(), &format!("{path}.after"));
        self.validate_hook(scenario.before_each.as_ref(), &format!("{path}.before_each"));
        self.validate_hook(scenario.after_each.as_ref(), &format!("{path}.after_each"));
        self.validate_run_block(scenario.run.as_ref(), &format!("{path}.run"));
        for (i, assertion) in scenario.assertions.iter().enumerate() {
            self.validate_assertion(assertion, &format!("{path}.assertions[{i}]"));
        }
        self.validate_scenarios(&scenario.scenarios, &format!("{path}.scenarios"));
    }

    fn validate_scenarios(&mut self, scenarios: &[Scenario], base: &str) {
        let mut seen: HashSet<&str> = HashSet::new();
        for (i, scenario) in scenarios.iter().enumerate() {
            let path = format!("{base}[{i}]");
            // A missing id is already reported as required
            if !scenario.id.is_empty() && !seen.insert(scenario.id.as_str()) {
                self.add_error(format!("{path}.id"), "duplicate");
            }
            self.validate_scenario(scenario, &path);
        }
    }
}

/// Validate a parsed context, returning every structural problem
pub fn validate(context: &Context, file: &str) -> Vec<ValidationError> {
    let mut validator = Validator {
        file,
        errors: Vec::new(),
    };
    validator.check_on_failure(&context.on_failure, "on_failure".to_string());
    validator.validate_hook(context.before.as_ref(), "before");
    validator.validate_hook(context.before_each.as_ref(), "before_each");
    validator.validate_hook(context.after.as_ref(), "after");
    validator.validate_hook(context.after_each.as_ref(), "after_each");
    validator.validate_scenarios(&context.scenarios, "scenarios");
    validator.errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::model::parse_context;

    fn errors_for(yaml: &str) -> Vec<ValidationError> {
        validate(&parse_context(yaml.as_bytes()).unwrap(), "context.yaml")
    }

    fn leaf(id: &str) -> Scenario {
        Scenario {
            id: id.to_string(),
            run: Some(RunBlock {
                command: "true".to_string(),
                timeout: String::new(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_spec_has_no_errors() {
        let errors = errors_for(
            r#"
name: Valid
on_failure: abort_run
before: { run: ./start.sh, timeout: 10s }
scenarios:
  - id: group
    before_each: { run: ./reset.sh }
    scenarios:
      - id: a
        run: { command: echo a, timeout: 1m30s }
        assertions:
          - command: assert_equals a ${RUN_OUTPUT}/stdout
      - id: b
        on_failure: continue
        run: { command: echo b }
"#,
        );
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn test_missing_id_is_required() {
        let errors = errors_for("scenarios:\n  - name: Missing ID\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "scenarios[0].id");
        assert_eq!(errors[0].message, "required");
        assert_eq!(errors[0].file, "context.yaml");
    }

    #[test]
    fn test_invalid_on_failure_lists_choices() {
        let errors = errors_for("on_failure: invalid_value\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "on_failure");
        for choice in ["skip_children", "continue", "abort_run"] {
            assert!(errors[0].message.contains(choice));
        }

        let errors = errors_for("scenarios:\n  - id: t\n    on_failure: bad\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "scenarios[0].on_failure");
    }

    #[test]
    fn test_empty_commands_are_required() {
        let errors = errors_for("before: { timeout: 5s }\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "before.run");

        let errors = errors_for("scenarios:\n  - id: t\n    run: { timeout: 10s }\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "scenarios[0].run.command");

        let errors = errors_for(
            "scenarios:\n  - id: t\n    run: { command: echo }\n    assertions:\n      - timeout: 1s\n",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "scenarios[0].assertions[0].command");
    }

    #[test]
    fn test_invalid_timeouts() {
        let errors = errors_for("before: { run: echo, timeout: invalid }\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "before.timeout");
        assert!(errors[0].message.contains("duration"));

        let errors = errors_for(
            "scenarios:\n  - id: t\n    run: { command: echo, timeout: bad }\n    assertions:\n      - { command: assert_equals a b, timeout: soon }\n",
        );
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["scenarios[0].run.timeout", "scenarios[0].assertions[0].timeout"]
        );
    }

    #[test]
    fn test_group_with_run_block_cites_group() {
        let mut group = leaf("g");
        group.scenarios = vec![leaf("child")];
        let context = Context {
            scenarios: vec![group],
            ..Default::default()
        };

        let errors = validate(&context, "context.yaml");
        let run_errors: Vec<_> = errors
            .iter()
            .filter(|e| e.path == "scenarios[0].run")
            .collect();
        assert_eq!(run_errors.len(), 1);
        assert!(run_errors[0].message.contains("group"));
    }

    #[test]
    fn test_leaf_cannot_have_each_hooks() {
        let errors = errors_for(
            "scenarios:\n  - id: t\n    run: { command: echo }\n    before_each: { run: a }\n    after_each: { run: b }\n",
        );
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["scenarios[0].before_each", "scenarios[0].after_each"]
        );
    }

    #[test]
    fn test_duplicate_ids_are_per_parent() {
        let mut first = Scenario {
            id: "group".to_string(),
            scenarios: vec![leaf("x"), leaf("y")],
            ..Default::default()
        };
        // Same child ids under another parent are fine
        let second = Scenario {
            id: "other".to_string(),
            scenarios: vec![leaf("x"), leaf("y")],
            ..Default::default()
        };
        first.scenarios.push(leaf("x"));
        let context = Context {
            scenarios: vec![first, second],
            ..Default::default()
        };

        let errors = validate(&context, "context.yaml");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "scenarios[0].scenarios[2].id");
        assert_eq!(errors[0].message, "duplicate");
    }

    #[test]
    fn test_duplicate_count_is_order_independent() {
        let ids = ["a", "b", "a", "c", "b", "a"];
        let forward: Vec<Scenario> = ids.iter().map(|id| leaf(id)).collect();
        let mut reversed = forward.clone();
        reversed.reverse();

        let count = |scenarios: Vec<Scenario>| {
            let context = Context {
                scenarios,
                ..Default::default()
            };
            let mut dups: Vec<String> = Vec::new();
            for error in validate(&context, "f") {
                if error.message == "duplicate" {
                    let index: usize = error.path["scenarios[".len()..error.path.find(']').unwrap()]
                        .parse()
                        .unwrap();
                    dups.push(context.scenarios[index].id.clone());
                }
            }
            dups.sort();
            dups
        };

        assert_eq!(count(forward), vec!["a", "a", "b"]);
        assert_eq!(count(reversed), vec!["a", "a", "b"]);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let context = parse_context(b"on_failure: nope\nscenarios:\n  - run: {}\n").unwrap();
        assert_eq!(validate(&context, "f"), validate(&context, "f"));
        assert_eq!(validate(&context, "f").len(), 3);
    }

    #[test]
    fn test_display_format() {
        let error = ValidationError {
            file: "spec/context.yaml".to_string(),
            path: "scenarios[0].id".to_string(),
            message: "required".to_string(),
        };
        assert_eq!(error.to_string(), "spec/context.yaml: scenarios[0].id: required");
    }
}
