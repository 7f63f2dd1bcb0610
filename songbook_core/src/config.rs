use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// 未能从歌曲或源文件中识别语言时使用的语言代码。
pub const DEFAULT_LANGUAGE: &str = "pl";

/// 输出的文档格式。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum OutputVariant {
    /// 独立的网页文档。
    #[default]
    #[serde(alias = "html")]
    #[strum(to_string = "web", serialize = "html")]
    Web,
    /// 用于电子书打包的 XHTML 片段文档。
    #[serde(alias = "xhtml")]
    #[strum(to_string = "epub", serialize = "xhtml")]
    Epub,
}

impl OutputVariant {
    /// 该格式对应的文件扩展名。
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Web => "html",
            Self::Epub => "xhtml",
        }
    }
}

/// 渲染选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct RenderOptions {
    /// 无法识别歌曲语言时使用的语言代码。
    pub default_language: String,
    /// 写入 `<head>` 的样式表链接，按顺序输出。
    pub stylesheets: Vec<String>,
    /// 网站根地址。设置后网页格式会输出 canonical 链接和 `og:url`。
    #[builder(setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// 是否缩进输出。含有文本的元素内部永远不会被缩进。
    pub pretty_print: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            stylesheets: vec![
                "CSS/song_common.css".to_string(),
                "CSS/song.css".to_string(),
            ],
            base_url: None,
            pretty_print: true,
        }
    }
}

/// 占位符替换表。按插入顺序逐个进行纯文本替换。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Substitutions(IndexMap<String, String>);

impl Substitutions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入一条替换规则。已存在的键保留原位置，只更新替换值。
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// 返回一个附加了给定规则的新替换表，原表不变。
    #[must_use]
    pub fn extended<I, K, V>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = self.clone();
        merged.extend(extra);
        merged
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 对文本依次应用所有替换规则。空键会被跳过。
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        self.iter()
            .filter(|(key, _)| !key.is_empty())
            .fold(text.to_string(), |acc, (key, value)| acc.replace(key, value))
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Substitutions {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Substitutions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut substitutions = Self::new();
        substitutions.extend(iter);
        substitutions
    }
}
