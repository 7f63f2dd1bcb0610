//! # 标记树
//!
//! 渲染过程中使用的可拥有的文档树。节点为值类型，`clone` 即深拷贝，
//! 因此同一份模板可以安全地在多首歌曲之间复用。

/// 文档树中的节点：元素或文本。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// 一个带属性和子节点的元素。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// 标签名，可以带命名空间前缀，例如 `epub:switch`。
    pub name: String,
    /// 按写入顺序排列的属性。
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 设置属性。同名属性会被覆盖并保留原位置。
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some((_, existing)) = self.attributes.iter_mut().find(|(k, _)| *k == key) {
            *existing = value;
        } else {
            self.attributes.push((key, value));
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    #[must_use]
    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.with_attribute("class", class)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 元素的 `class` 属性是否包含给定的类名。
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children
            .extend(children.into_iter().map(Node::Element));
        self
    }

    /// 追加文本。如果最后一个子节点已是文本，则直接拼接到它的末尾。
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.push_text(text);
        self
    }

    /// 直接子元素。
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// 是否含有直接文本子节点（包括纯空白）。这样的元素内部不能插入缩进。
    pub fn has_mixed_content(&self) -> bool {
        self.children
            .iter()
            .any(|node| matches!(node, Node::Text(text) if !text.is_empty()))
    }

    /// 所有后代文本节点按文档顺序拼接的结果。
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    /// 深度优先查找第一个满足条件的后代元素（包括自身）。
    pub fn find(&self, predicate: &impl Fn(&Self) -> bool) -> Option<&Self> {
        if predicate(self) {
            return Some(self);
        }
        self.elements().find_map(|child| child.find(predicate))
    }

    /// 深度优先收集所有满足条件的后代元素（包括自身）。
    pub fn find_all<'a>(&'a self, predicate: &impl Fn(&Self) -> bool) -> Vec<&'a Self> {
        let mut found = Vec::new();
        self.collect_matching(predicate, &mut found);
        found
    }

    fn collect_matching<'a>(&'a self, predicate: &impl Fn(&Self) -> bool, found: &mut Vec<&'a Self>) {
        if predicate(self) {
            found.push(self);
        }
        for child in self.elements() {
            child.collect_matching(predicate, found);
        }
    }

    pub fn find_by_class(&self, class: &str) -> Option<&Self> {
        self.find(&|element: &Self| element.has_class(class))
    }

    pub fn find_all_by_class(&self, class: &str) -> Vec<&Self> {
        self.find_all(&|element: &Self| element.has_class(class))
    }

    /// 对所有属性值和文本节点（递归）应用给定的变换。
    pub fn map_text(&mut self, transform: &impl Fn(&str) -> String) {
        for (_, value) in &mut self.attributes {
            *value = transform(value);
        }
        for node in &mut self.children {
            match node {
                Node::Text(text) => *text = transform(text),
                Node::Element(element) => element.map_text(transform),
            }
        }
    }
}
