use std::io;

use quick_xml::{
    Error as QuickXmlErrorMain, encoding::EncodingError,
    events::attributes::AttrError as QuickXmlAttrError,
};
use thiserror::Error;

/// 定义歌曲渲染过程中可能发生的各种错误。
#[derive(Error, Debug)]
pub enum RenderError {
    /// XML 读写错误，通常来自 `quick-xml` 库。
    #[error("XML 错误: {0}")]
    Xml(#[from] QuickXmlErrorMain),
    /// XML 属性解析错误，通常来自 `quick-xml` 库。
    #[error("XML 属性错误: {0}")]
    Attribute(#[from] QuickXmlAttrError),
    /// XML 文本编码或解码错误。
    #[error("文本编码或解码错误: {0}")]
    Encoding(#[from] EncodingError),
    /// 外部提供的标记片段无效。
    #[error("无效的标记片段: {0}")]
    InvalidFragment(String),
    /// 文件读写等IO错误。
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
    /// JSON 解析或序列化错误。
    #[error("处理 JSON 内容 {context} 失败: {source}")]
    Json {
        /// 底层 `serde_json` 错误
        #[source]
        source: serde_json::Error,
        /// 有关错误发生位置的上下文信息。
        context: String,
    },
    /// TOML 配置解析错误。
    #[error("解析配置失败: {0}")]
    Config(#[from] toml::de::Error),
    /// 从字节序列转换为 UTF-8 字符串失败。
    #[error("UTF-8 转换错误: {0}")]
    FromUtf8(#[from] std::string::FromUtf8Error),
    /// 同一批次中的多首歌曲会写入同一个输出文件。
    #[error("多首歌曲使用同一个输出文件名: {0}")]
    DuplicateOutput(String),
    /// 原始源文件不是格式正确的 XML 文档。
    #[error("源文件格式错误: {0}")]
    MalformedSource(String),
}

impl RenderError {
    /// 创建一个带有上下文的 `Json` 错误。
    #[must_use]
    pub fn json(source: serde_json::Error, context: impl Into<String>) -> Self {
        Self::Json {
            source,
            context: context.into(),
        }
    }

    /// 创建一个 `InvalidFragment` 错误。
    #[must_use]
    pub fn invalid_fragment(message: impl std::fmt::Display) -> Self {
        Self::InvalidFragment(message.to_string())
    }
}
