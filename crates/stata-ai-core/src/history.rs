use crate::llm::Message;
use std::collections::VecDeque;

pub const DEFAULT_MAX_HISTORY: usize = 20;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an expert assistant for the Stata statistical software. Your job is to:
1. Answer questions about using Stata
2. Provide Stata code examples with explanations
3. Explain statistical concepts and methods
4. Help debug errors in Stata code
5. Recommend good Stata practice

Answer clearly and concisely. Any code you provide must run in Stata as-is.";

/// Sliding window of past user/assistant turns.
///
/// The system prompt lives beside the buffer and is only prepended when a
/// request is assembled.
pub struct ConversationHistory {
    messages: VecDeque<Message>,
    max_history: usize,
    system_prompt: String,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            max_history: DEFAULT_MAX_HISTORY,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Capacity in question/answer pairs; the buffer holds at most twice this many messages.
    pub fn with_max_history(mut self, pairs: usize) -> Self {
        self.max_history = pairs;
        self.trim_if_needed();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::assistant(content));
    }

    /// Append and evict from the front until the bound holds. Alternation of
    /// roles is not enforced, so eviction can split a question from its answer.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push_back(message);
        self.trim_if_needed();
    }

    /// System message (override or default) followed by the stored turns.
    pub fn assemble(&self, system_prompt: Option<&str>) -> Vec<Message> {
        let prompt = system_prompt
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.system_prompt);
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(Message::system(prompt));
        messages.extend(self.messages.iter().cloned());
        messages
    }

    /// Stored turns only, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn trim_if_needed(&mut self) {
        let limit = self.max_history * 2;
        while self.messages.len() > limit {
            self.messages.pop_front();
        }
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}
