use std::cell::RefCell;
use std::rc::Rc;

/// Where user-visible text goes. Every call renders one string.
pub trait Console {
    fn display(&self, text: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn display(&self, text: &str) {
        println!("{text}");
    }
}

/// Records every displayed string. Clones share the same buffer, so a host
/// can keep a handle while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsole {
    lines: Rc<RefCell<Vec<String>>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn text(&self) -> String {
        self.lines.borrow().join("\n")
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.borrow_mut())
    }
}

impl Console for MemoryConsole {
    fn display(&self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}

impl<T: Console + ?Sized> Console for Box<T> {
    fn display(&self, text: &str) {
        (**self).display(text)
    }
}
