use std::collections::HashMap;

use crate::scene::Scene;

/// 工具之外的文本命令。
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// 按空白拆分一行输入，首词为命令名（小写）。
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let name = words.next()?.to_lowercase();
        Some(Self {
            name,
            args: words.map(str::to_string).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub scene: &'a mut Scene,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(UndoCommand);
        bus.register(RedoCommand);
        bus.register(NewDocumentCommand);
        bus.register(FocusSelectionCommand);
        bus.register(ClearSelectionCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn handles(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

struct UndoCommand;

impl CommandHandler for UndoCommand {
    fn name(&self) -> &'static str {
        "undo"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match context.scene.undo() {
            Ok(label) => CommandResponse::ok(format!("已撤销 {label}")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct RedoCommand;

impl CommandHandler for RedoCommand {
    fn name(&self) -> &'static str {
        "redo"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match context.scene.redo() {
            Ok(label) => CommandResponse::ok(format!("已重做 {label}")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct NewDocumentCommand;

impl CommandHandler for NewDocumentCommand {
    fn name(&self) -> &'static str {
        "new"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.scene.reset();
        CommandResponse::ok("已新建文档")
    }
}

struct FocusSelectionCommand;

impl CommandHandler for FocusSelectionCommand {
    fn name(&self) -> &'static str {
        "focus_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.scene.focus_on_selection();
        CommandResponse::ok("视口已聚焦当前选中对象")
    }
}

struct ClearSelectionCommand;

impl CommandHandler for ClearSelectionCommand {
    fn name(&self) -> &'static str {
        "clear_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.scene.clear_selection();
        CommandResponse::ok("选中集已清空")
    }
}

#[cfg(test)]
mod tests {
    use plancad_core::geometry::Point2;

    use super::*;
    use crate::scene::Scene;

    #[test]
    fn focus_and_clear_commands_work() {
        let mut scene = Scene::new();
        let ids = scene.populate_demo();
        scene.select(ids.column).unwrap();

        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        let response = bus.dispatch(&CommandRequest::new("focus_selection"), &mut context);
        assert!(response.success);
        assert!(
            context
                .scene
                .viewport()
                .center
                .approx_eq(Point2::new(300.0, 200.0), 1e-9)
        );

        let response = bus.dispatch(&CommandRequest::new("clear_selection"), &mut context);
        assert!(response.success);
        assert_eq!(context.scene.selection_len(), 0);
    }

    #[test]
    fn undo_redo_and_new_document() {
        let mut scene = Scene::new();
        scene.apply("circle", |doc| doc.add_circle(Point2::new(0.0, 0.0), 1.0));

        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        let undo = bus.dispatch(&CommandRequest::new("undo"), &mut context);
        assert!(undo.success);
        assert_eq!(undo.message.as_deref(), Some("已撤销 circle"));
        assert!(context.scene.document().is_empty());
        assert!(!bus.dispatch(&CommandRequest::new("undo"), &mut context).success);

        assert!(bus.dispatch(&CommandRequest::new("redo"), &mut context).success);
        assert_eq!(context.scene.document().len(), 1);

        assert!(bus.dispatch(&CommandRequest::new("new"), &mut context).success);
        assert!(context.scene.document().is_empty());
        assert!(!context.scene.history().can_undo());
    }

    #[test]
    fn unknown_command_fails() {
        let mut scene = Scene::new();
        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };
        let request = CommandRequest::parse("  Frobnicate  now ").expect("request");
        assert_eq!(request.name, "frobnicate");
        assert_eq!(request.args, vec!["now".to_string()]);
        assert!(!bus.dispatch(&request, &mut context).success);
        assert!(CommandRequest::parse("   ").is_none());
    }
}
