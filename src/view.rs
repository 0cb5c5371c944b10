#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PopOutcome<T> {
    Popped(T),
    /// Only the base view was left. The caller should exit.
    Exit,
}

#[derive(Debug, Clone)]
pub struct ViewStack<T> {
    base: T,
    above: Vec<T>,
}

impl<T> ViewStack<T> {
    pub fn new(base: T) -> Self {
        Self {
            base,
            above: Vec::new(),
        }
    }

    pub fn push(&mut self, view: T) {
        self.above.push(view);
    }

    pub fn pop(&mut self) -> PopOutcome<T> {
        match self.above.pop() {
            Some(view) => PopOutcome::Popped(view),
            None => PopOutcome::Exit,
        }
    }

    pub fn peek(&self) -> &T {
        self.above.last().unwrap_or(&self.base)
    }

    pub fn peek_mut(&mut self) -> &mut T {
        self.above.last_mut().unwrap_or(&mut self.base)
    }

    pub fn len(&self) -> usize {
        self.above.len() + 1
    }

    pub fn at_base(&self) -> bool {
        self.above.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DetailMode {
    Yaml,
    Describe,
}

impl DetailMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Describe => "describe",
        }
    }
}

#[derive(Debug, Clone)]
pub enum View {
    Table,
    Detail(DetailView),
}

#[derive(Debug, Clone)]
pub struct DetailView {
    title: String,
    text: String,
    mode: DetailMode,
    scroll: u16,
    width: u16,
    height: u16,
}

impl DetailView {
    pub fn new(mode: DetailMode, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            mode,
            scroll: 0,
            width: 1,
            height: 1,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> DetailMode {
        self.mode
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.scroll = self.scroll.min(self.max_scroll());
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.max_scroll() as isize;
        let current = self.scroll as isize;
        self.scroll = (current + delta).clamp(0, max) as u16;
    }

    pub fn page_step(&self) -> isize {
        self.height.saturating_div(2).max(1) as isize
    }

    pub fn scroll_top(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_bottom(&mut self) {
        self.scroll = self.max_scroll();
    }

    pub fn max_scroll(&self) -> u16 {
        let visual_lines = visual_line_count(&self.text, self.width as usize);
        let max = visual_lines.saturating_sub(self.height.max(1) as usize);
        max.min(u16::MAX as usize) as u16
    }
}

fn visual_line_count(text: &str, width: usize) -> usize {
    let width = width.max(1);
    text.lines()
        .map(|line| line.chars().count().div_ceil(width).max(1))
        .sum::<usize>()
        .max(1)
}
