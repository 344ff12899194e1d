//! 输入分发登记与命令行输入解析。

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use plancad_core::geometry::{Point2, Vector2};

/// 工具可以订阅的输入种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputKind {
    Pointer,
    Text,
    Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
}

type Listeners = RefCell<BTreeMap<u64, InputKind>>;

/// 记录当前有哪些输入监听。只有持有对应订阅时，管理器才把该类输入转发给工具。
#[derive(Debug, Default, Clone)]
pub struct InputRouter {
    listeners: Rc<Listeners>,
    next: Rc<Cell<u64>>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: InputKind) -> Subscription {
        let id = self.next.get();
        self.next.set(id + 1);
        self.listeners.borrow_mut().insert(id, kind);
        Subscription {
            id,
            kind,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    pub fn is_listening(&self, kind: InputKind) -> bool {
        self.listeners.borrow().values().any(|k| *k == kind)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// 监听登记的作用域守卫，析构时自动注销。
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    kind: InputKind,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn kind(&self) -> InputKind {
        self.kind
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().remove(&self.id);
        }
    }
}

/// 解析 `x,y` 绝对坐标或 `@dx,dy` 相对坐标（相对 `base`）。
pub fn parse_point(text: &str, base: Option<Point2>) -> Option<Point2> {
    let text = text.trim();
    let (relative, body) = match text.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (x, y) = body.split_once(',')?;
    let x: f64 = x.trim().parse().ok()?;
    let y: f64 = y.trim().parse().ok()?;
    if !(x.is_finite() && y.is_finite()) {
        return None;
    }
    if relative {
        Some(base?.translate(Vector2::new(x, y)))
    } else {
        Some(Point2::new(x, y))
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// 解析对象 ID，接受 `12` 或 `#12`。
pub fn parse_object_id(text: &str) -> Option<u64> {
    let text = text.trim();
    text.strip_prefix('#').unwrap_or(text).parse().ok()
}
