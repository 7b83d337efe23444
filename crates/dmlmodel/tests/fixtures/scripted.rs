//! Scripted execution channel.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use dmlmodel::{Completion, ContextToken, Cx, ExecutionChannel};

/// Records every statement it receives and answers with queued completions.
///
/// With nothing queued it answers with an empty successful completion.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    sent: Mutex<Vec<(String, Option<ContextToken>)>>,
    replies: Mutex<VecDeque<Completion>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the completion for the next statement.
    pub fn reply(&self, completion: Completion) {
        self.replies.lock().unwrap().push_back(completion);
    }

    /// SQL text of every statement received, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn last(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(sql, _)| sql.clone())
    }

    pub fn contexts(&self) -> Vec<Option<ContextToken>> {
        self.sent.lock().unwrap().iter().map(|(_, ctx)| *ctx).collect()
    }
}

impl ExecutionChannel for ScriptedChannel {
    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        context: Option<ContextToken>,
    ) -> impl Future<Output = Completion> + Send {
        self.sent.lock().unwrap().push((sql.to_string(), context));
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or_default();
        async move { reply }
    }
}

/// Raw bytes of a text column.
pub fn text(s: &str) -> Option<Vec<u8>> {
    Some(s.as_bytes().to_vec())
}
