//! 命令行会话：把一行输入分派给活动工具、文本命令或新工具。

use plancad_core::geometry::Point2;
use tracing::debug;

use crate::command::{CommandBus, CommandContext, CommandRequest, CommandResponse};
use crate::scene::Scene;
use crate::tool::input::Key;
use crate::tool::{ToolError, ToolManager};

/// 一次提交的去向。
#[derive(Debug, Clone)]
pub enum Reply {
    /// 由工具管理器处理，结果见提示通道。
    Tool,
    /// 由命令总线处理。
    Command(CommandResponse),
}

pub struct Session {
    scene: Scene,
    bus: CommandBus,
    tools: ToolManager,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Scene::new())
    }
}

impl Session {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            bus: CommandBus::new(),
            tools: ToolManager::new(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolManager {
        &mut self.tools
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    /// 活动工具优先接收输入；空闲时先查命令总线，再按工具名启动。
    /// `undo`/`redo`/`new` 在工具活动时也生效，会先取消该工具。
    pub fn submit(&mut self, line: &str) -> Result<Reply, ToolError> {
        if let Some(request) = CommandRequest::parse(line) {
            let interrupts = matches!(request.name.as_str(), "undo" | "redo" | "new");
            if self.bus.handles(&request.name) && (interrupts || !self.tools.is_active()) {
                if interrupts {
                    self.tools.cancel();
                }
                return Ok(Reply::Command(self.dispatch(&request)));
            }
        }
        self.tools.handle_text_input(&mut self.scene, line)?;
        Ok(Reply::Tool)
    }

    pub fn click(&mut self, point: Point2) -> Result<(), ToolError> {
        self.tools.handle_pointer(&mut self.scene, point)
    }

    pub fn key(&mut self, key: Key) -> Result<(), ToolError> {
        self.tools.handle_key(&mut self.scene, key)
    }

    fn dispatch(&mut self, request: &CommandRequest) -> CommandResponse {
        let mut context = CommandContext {
            scene: &mut self.scene,
        };
        let response = self.bus.dispatch(request, &mut context);
        debug!(command = %request.name, success = response.success, "command dispatched");
        let prompt = self.tools.prompt_mut();
        match (&response.message, response.success) {
            (Some(message), true) => prompt.info(message.clone()),
            (Some(message), false) => prompt.alert(message.clone()),
            (None, _) => {}
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolState;
    use crate::tool::prompt::PromptLevel;

    #[test]
    fn lines_start_tools_and_run_commands() {
        let mut session = Session::default();
        session
            .scene_mut()
            .document_mut()
            .add_circle(Point2::new(0.0, 0.0), 10.0);

        session.submit("e").unwrap();
        session.click(Point2::new(10.0, 0.0)).unwrap();
        session.submit("").unwrap();
        assert_eq!(session.tools().state(), ToolState::Idle);
        assert!(session.scene().document().is_empty());

        let reply = session.submit("undo").unwrap();
        assert!(matches!(reply, Reply::Command(ref r) if r.success));
        assert_eq!(session.scene().document().len(), 1);
        assert_eq!(
            session.tools().prompt().last().map(|m| m.level),
            Some(PromptLevel::Info)
        );
    }

    #[test]
    fn undo_cancels_active_tool() {
        let mut session = Session::default();
        session
            .scene_mut()
            .apply("circle", |doc| doc.add_circle(Point2::new(0.0, 0.0), 10.0));

        session.submit("move").unwrap();
        assert!(session.tools().is_active());
        session.submit("undo").unwrap();
        assert!(!session.tools().is_active());
        assert!(session.scene().document().is_empty());
    }

    #[test]
    fn selection_commands_are_plain_text_inside_tools() {
        let mut session = Session::default();
        session.submit("block").unwrap();
        session.submit("clear_selection").unwrap();
        assert!(session.tools().is_active());
        assert_eq!(session.tools().prompt().current(), Some("指定基点:"));
    }

    #[test]
    fn failed_command_raises_alert() {
        let mut session = Session::default();
        let reply = session.submit("redo").unwrap();
        assert!(matches!(reply, Reply::Command(ref r) if !r.success));
        assert_eq!(
            session.tools().prompt().last().map(|m| m.level),
            Some(PromptLevel::Alert)
        );
    }
}
