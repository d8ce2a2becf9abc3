use crate::generation::{Step, StepObserver};

use tracing::debug;

/// Prints a line per tool call and per tool result as steps finish.
pub struct TurnReporter {
    debug: bool,
}

impl TurnReporter {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn lines(&self, step: &Step) -> Vec<String> {
        let calls = step.tool_calls.iter().map(|call| {
            if self.debug {
                format!("[calling tool {}({})]", call.name, call.json)
            } else {
                format!("[calling tool {}]", call.name)
            }
        });
        let results = step.tool_results.iter().map(|result| {
            match (result.output.is_error, self.debug) {
                (false, _) => format!("[tool {} succeeded]", result.name),
                (true, false) => format!("[tool {} failed]", result.name),
                (true, true) => format!("[tool {} failed: {}]", result.name, result.output.content),
            }
        });
        calls.chain(results).collect()
    }
}

impl StepObserver for TurnReporter {
    fn on_step(&mut self, step: &Step) {
        for result in step.tool_results.iter().filter(|result| result.output.is_error) {
            debug!(tool = %result.name, call_id = %result.call_id, payload = %result.output.content, "tool error");
        }
        for line in self.lines(step) {
            println!("{line}");
        }
    }
}
