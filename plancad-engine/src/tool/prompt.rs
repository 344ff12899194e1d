//! 命令提示通道。所有面向用户的提示、警告与错误都经由这里输出。

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptLevel {
    /// 当前步骤的输入提示。
    Prompt,
    Info,
    Warning,
    /// 命令无法执行。
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub level: PromptLevel,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct PromptChannel {
    messages: Vec<PromptMessage>,
    current: Option<String>,
}

impl PromptChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_prompt(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.current = Some(text.clone());
        self.push(PromptLevel::Prompt, text);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(PromptLevel::Info, text.into());
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!(message = %text, "command warning");
        self.push(PromptLevel::Warning, text);
    }

    pub fn alert(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!(message = %text, "command alert");
        self.push(PromptLevel::Alert, text);
    }

    /// 清除当前步骤提示（命令结束时调用）。
    pub fn clear_prompt(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&PromptMessage> {
        self.messages.last()
    }

    /// 取出并清空累积的消息。
    pub fn drain(&mut self) -> Vec<PromptMessage> {
        std::mem::take(&mut self.messages)
    }

    fn push(&mut self, level: PromptLevel, text: String) {
        if level == PromptLevel::Info {
            info!(message = %text, "command");
        }
        self.messages.push(PromptMessage { level, text });
    }
}
