//! Render dropped constraints as prompt instructions.
//!
//! Whatever an adapter had to strip from the wire schema is still a requirement; it is handed to
//! the model as plain text appended to the system prompt. Output is sorted by field path, then by
//! constraint type, so the same schema always yields the same prompt.

use serde_json::Value;

use super::adapter::{ConstraintType, RemovedConstraint};

const HEADER: &str = "The response must also satisfy these requirements:";

/// Render removed constraints as an instruction block, or `None` when there are none
pub fn to_instruction_text(removed_constraints: &[RemovedConstraint]) -> Option<String> {
    if removed_constraints.is_empty() {
        return None;
    }

    let mut sorted: Vec<&RemovedConstraint> = removed_constraints.iter().collect();
    sorted.sort_by(|a, b| {
        a.field_path
            .cmp(&b.field_path)
            .then(a.constraint_type.cmp(&b.constraint_type))
            .then_with(|| a.value.to_string().cmp(&b.value.to_string()))
    });
    sorted.dedup();

    let mut text = String::from(HEADER);
    for constraint in sorted {
        text.push_str("\n- ");
        text.push_str(&render_line(constraint));
    }
    Some(text)
}

/// Append the instruction block for `removed_constraints` to an optional base prompt
pub fn append_to_prompt(base: Option<&str>, removed_constraints: &[RemovedConstraint]) -> Option<String> {
    match (base, to_instruction_text(removed_constraints)) {
        (Some(base), Some(extra)) if !base.is_empty() => Some(format!("{}\n\n{}", base, extra)),
        (_, Some(extra)) => Some(extra),
        (base, None) => base.map(str::to_string),
    }
}

fn render_line(constraint: &RemovedConstraint) -> String {
    let subject = if constraint.field_path.is_empty() {
        "The response".to_string()
    } else {
        format!("Field `{}`", constraint.field_path)
    };
    let value = display_value(&constraint.value);

    let requirement = match constraint.constraint_type {
        ConstraintType::MinLength => format!("must have at least {} characters", value),
        ConstraintType::MaxLength => format!("must have at most {} characters", value),
        ConstraintType::Pattern => format!("must match the regular expression `{}`", value),
        ConstraintType::Format => format!("must be formatted as {}", value),
        ConstraintType::Minimum => format!("must be greater than or equal to {}", value),
        ConstraintType::Maximum => format!("must be less than or equal to {}", value),
        ConstraintType::ExclusiveMinimum => format!("must be greater than {}", value),
        ConstraintType::ExclusiveMaximum => format!("must be less than {}", value),
        ConstraintType::MinItems => format!("must contain at least {} items", value),
        ConstraintType::MaxItems => format!("must contain at most {} items", value),
        ConstraintType::AdditionalProperties => match constraint.value {
            Value::Bool(false) => "must not contain properties other than the ones defined".to_string(),
            _ => "may contain properties other than the ones defined".to_string(),
        },
    };

    format!("{} {}.", subject, requirement)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_list_is_none() {
        assert_eq!(to_instruction_text(&[]), None);
    }

    #[test]
    fn test_lines_sorted_by_path_then_type() {
        let removed = vec![
            RemovedConstraint::new(ConstraintType::MaxItems, "tags", json!(5)),
            RemovedConstraint::new(ConstraintType::MaxLength, "name", json!(40)),
            RemovedConstraint::new(ConstraintType::MinLength, "name", json!(2)),
            RemovedConstraint::new(ConstraintType::Minimum, "age", json!(0)),
        ];

        let text = to_instruction_text(&removed).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "- Field `age` must be greater than or equal to 0.");
        assert_eq!(lines[2], "- Field `name` must have at least 2 characters.");
        assert_eq!(lines[3], "- Field `name` must have at most 40 characters.");
        assert_eq!(lines[4], "- Field `tags` must contain at most 5 items.");
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let a = RemovedConstraint::new(ConstraintType::Pattern, "code", json!("^[0-9]+$"));
        let b = RemovedConstraint::new(ConstraintType::Format, "when", json!("email"));

        assert_eq!(
            to_instruction_text(&[a.clone(), b.clone()]),
            to_instruction_text(&[b, a])
        );
    }

    #[test]
    fn test_root_and_additional_properties_phrasing() {
        let removed = vec![RemovedConstraint::new(
            ConstraintType::AdditionalProperties,
            "",
            json!(false),
        )];
        let text = to_instruction_text(&removed).unwrap();
        assert!(text.ends_with(
            "- The response must not contain properties other than the ones defined."
        ));
    }

    #[test]
    fn test_append_to_prompt() {
        let removed = vec![RemovedConstraint::new(ConstraintType::MinItems, "xs", json!(2))];

        let prompt = append_to_prompt(Some("You are helpful."), &removed).unwrap();
        assert!(prompt.starts_with("You are helpful.\n\n"));
        assert!(prompt.contains("Field `xs` must contain at least 2 items."));

        assert_eq!(append_to_prompt(Some("Base"), &[]), Some("Base".to_string()));
        assert_eq!(append_to_prompt(None, &[]), None);
        assert!(append_to_prompt(None, &removed).unwrap().starts_with(HEADER));
    }
}
