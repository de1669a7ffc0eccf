//! cleartool::mock
//!
//! Scripted executor for deterministic testing.
//!
//! # Design
//!
//! Replies are matched by subcommand, optionally narrowed to requests whose
//! arguments contain a given string. Rules are tried in the order they were
//! added; the first one that matches and still has uses left answers.
//! Unscripted requests succeed with empty output. Every request is recorded.
//!
//! Failures go through the same [`classify`] as the process executor, so a
//! scripted "stream not found" reply surfaces as
//! [`CleartoolError::NotFound`] exactly as it would in production.
//!
//! # Example
//!
//! ```
//! use ccsync::cleartool::mock::MockCleartool;
//! use ccsync::cleartool::{CommandRequest, Executor, Op};
//!
//! let mock = MockCleartool::new()
//!     .fail_once("lsview", "cleartool: Error: No matching entries found for view tag \"v\".")
//!     .reply("lsview", "* v /views/v.vws");
//!
//! let probe = CommandRequest::new(Op::ListView { tag: "v".into() });
//! assert!(mock.run(&probe).unwrap_err().is_not_found());
//! assert!(mock.run(&probe).is_ok());
//! assert_eq!(mock.count("lsview"), 2);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use super::executor::{classify, CleartoolError, CommandOutput, Executor};
use super::request::CommandRequest;

/// Mock executor for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockCleartool {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug, Default)]
struct MockInner {
    rules: Vec<Rule>,
    requests: Vec<CommandRequest>,
}

#[derive(Debug)]
struct Rule {
    subcommand: String,
    arg_contains: Option<String>,
    output: CommandOutput,
    /// `None` means unlimited.
    uses_left: Option<usize>,
}

impl Rule {
    fn matches(&self, request: &CommandRequest) -> bool {
        if self.uses_left == Some(0) || self.subcommand != request.subcommand() {
            return false;
        }
        match &self.arg_contains {
            Some(needle) => request.args().iter().any(|arg| arg.contains(needle.as_str())),
            None => true,
        }
    }
}

impl MockCleartool {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(self, subcommand: &str, arg_contains: Option<&str>, output: CommandOutput, uses: Option<usize>) -> Self {
        self.lock().rules.push(Rule {
            subcommand: subcommand.to_string(),
            arg_contains: arg_contains.map(str::to_string),
            output,
            uses_left: uses,
        });
        self
    }

    /// Always answer `subcommand` with `stdout`.
    pub fn reply(self, subcommand: &str, stdout: &str) -> Self {
        self.add(subcommand, None, CommandOutput::ok(stdout), None)
    }

    /// Answer `subcommand` with `stdout` once.
    pub fn reply_once(self, subcommand: &str, stdout: &str) -> Self {
        self.add(subcommand, None, CommandOutput::ok(stdout), Some(1))
    }

    /// Answer `subcommand` requests mentioning `needle` with `stdout`.
    pub fn reply_when(self, subcommand: &str, needle: &str, stdout: &str) -> Self {
        self.add(subcommand, Some(needle), CommandOutput::ok(stdout), None)
    }

    /// Always fail `subcommand` with exit code 1 and `stderr`.
    pub fn fail(self, subcommand: &str, stderr: &str) -> Self {
        self.add(subcommand, None, failure(stderr), None)
    }

    /// Fail `subcommand` once with exit code 1 and `stderr`.
    pub fn fail_once(self, subcommand: &str, stderr: &str) -> Self {
        self.add(subcommand, None, failure(stderr), Some(1))
    }

    /// Fail `subcommand` requests mentioning `needle`.
    pub fn fail_when(self, subcommand: &str, needle: &str, stderr: &str) -> Self {
        self.add(subcommand, Some(needle), failure(stderr), None)
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<CommandRequest> {
        self.lock().requests.clone()
    }

    /// Subcommand names of every request seen so far, in order.
    pub fn subcommands(&self) -> Vec<&'static str> {
        self.lock().requests.iter().map(|r| r.subcommand()).collect()
    }

    /// How many times `subcommand` was run.
    pub fn count(&self, subcommand: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.subcommand() == subcommand)
            .count()
    }

    /// Rendered command lines of every request seen so far.
    pub fn command_lines(&self) -> Vec<String> {
        self.lock().requests.iter().map(|r| r.command_line()).collect()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn failure(stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: 1,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

impl Executor for MockCleartool {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput, CleartoolError> {
        let output = {
            let mut inner = self.lock();
            inner.requests.push(request.clone());
            match inner.rules.iter_mut().find(|rule| rule.matches(request)) {
                Some(rule) => {
                    if let Some(left) = rule.uses_left.as_mut() {
                        *left -= 1;
                    }
                    rule.output.clone()
                }
                None => CommandOutput::default(),
            }
        };
        classify(request, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleartool::request::Op;

    fn lsbl(stream: &str) -> CommandRequest {
        CommandRequest::new(Op::ListBaselines {
            format: "%Xn".into(),
            component: "component:c".into(),
            stream: stream.into(),
        })
    }

    #[test]
    fn unscripted_succeeds_empty() {
        let mock = MockCleartool::new();
        let out = mock.run(&lsbl("s")).unwrap();
        assert!(out.success());
        assert!(out.stdout.is_empty());
    }

    #[test]
    fn first_matching_rule_wins() {
        let mock = MockCleartool::new()
            .reply_when("lsbl", "stream:int", "int-bl")
            .reply("lsbl", "other");
        assert_eq!(mock.run(&lsbl("stream:int@\\p")).unwrap().stdout, "int-bl");
        assert_eq!(mock.run(&lsbl("stream:build")).unwrap().stdout, "other");
    }

    #[test]
    fn once_rules_are_consumed() {
        let mock = MockCleartool::new().reply_once("lsbl", "a").reply("lsbl", "b");
        assert_eq!(mock.run(&lsbl("s")).unwrap().stdout, "a");
        assert_eq!(mock.run(&lsbl("s")).unwrap().stdout, "b");
        assert_eq!(mock.run(&lsbl("s")).unwrap().stdout, "b");
    }

    #[test]
    fn failures_are_classified() {
        let mock = MockCleartool::new()
            .fail_when("lsbl", "gone", "cleartool: Error: Stream not found")
            .fail("lsbl", "cleartool: Error: permission denied");
        assert!(mock.run(&lsbl("gone")).unwrap_err().is_not_found());
        assert!(matches!(
            mock.run(&lsbl("here")).unwrap_err(),
            CleartoolError::CommandFailed { .. }
        ));
        assert!(mock.run(&lsbl("here").allow_failure()).is_ok());
    }

    #[test]
    fn requests_recorded_across_clones() {
        let mock = MockCleartool::new();
        let clone = mock.clone();
        clone.run(&lsbl("s")).unwrap();
        clone
            .run(&CommandRequest::new(Op::Update { path: "/v".into() }))
            .unwrap();
        assert_eq!(mock.subcommands(), vec!["lsbl", "update"]);
        assert_eq!(mock.command_lines()[1], "cleartool update /v");
        mock.clear_requests();
        assert!(mock.requests().is_empty());
    }
}
