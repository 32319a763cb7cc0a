//! Positional shell-script generation.

use serde::Serialize;

use crate::domain::model::Parameter;
use crate::domain::position::Position;

/// Script name used in the usage line when none is configured.
pub const DEFAULT_SCRIPT_NAME: &str = "./script";

/// A generated script together with the command line that invokes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub script: String,
    pub usage: String,
    pub parameter_count: usize,
}

/// Placeholder substituted for every selection of the parameter at `parameter_index`.
pub fn placeholder(parameter_index: usize) -> String {
    format!("${{{parameter_index}}}")
}

/// Replace every selection with its parameter's placeholder and wrap the result in `printf`.
///
/// Selections are applied in ascending start order. Their offsets refer to the original buffer,
/// so the output is assembled in one pass over it rather than by editing it in place.
pub fn generate(buffer: &str, parameters: &[Parameter], script_name: &str) -> Template {
    let mut spans: Vec<(Position, usize)> = parameters
        .iter()
        .enumerate()
        .flat_map(|(parameter_index, parameter)| {
            parameter
                .selections
                .iter()
                .map(move |selection| (selection.position, parameter_index))
        })
        .collect();
    spans.sort_by_key(|(position, _)| position.start);

    let chars: Vec<char> = buffer.chars().collect();
    let mut substituted = String::with_capacity(buffer.len());
    let mut cursor = 0;
    for (position, parameter_index) in spans {
        let start = position.start.clamp(cursor, chars.len());
        let end = position.end.clamp(start, chars.len());
        substituted.extend(&chars[cursor..start]);
        substituted.push_str(&placeholder(parameter_index));
        cursor = end;
    }
    substituted.extend(&chars[cursor..]);

    Template {
        script: format!("printf \"{}\"", escape_quotes(&substituted)),
        usage: usage_line(script_name, parameters.len()),
        parameter_count: parameters.len(),
    }
}

/// Backslash-escape single and double quotes so the text fits inside a double-quoted string.
pub fn escape_quotes(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '"' || ch == '\'' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn usage_line(script_name: &str, parameter_count: usize) -> String {
    let mut usage = format!("sh {script_name}");
    for index in 0..parameter_count {
        usage.push_str(&format!(" ${index}"));
    }
    usage
}
