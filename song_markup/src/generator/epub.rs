//! 电子书格式：带命名空间的 XHTML 文档。

use songbook_core::{OutputVariant, RenderError, RenderOptions, Song};
use tracing::debug;

use super::{RenderContext, SongConverter, compose_body, compose_song, head::epub_head};
use crate::{
    fragment::inject_fragments,
    language::resolve_language,
    serializer::{Dialect, mark_significant_whitespace, serialize_document, strip_row_joiners},
    tree::Element,
};

/// XHTML 命名空间。
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
/// EPUB 结构语义命名空间。
pub const EPUB_NAMESPACE: &str = "http://www.idpf.org/2007/ops";

/// 生成电子书内容文档的转换器。
///
/// 与网页格式使用相同的和弦分组，但没有搜索引擎元数据，并且会把紧邻
/// `<span>` 的空格改写为显式的空白元素。
#[derive(Debug, Clone, Default)]
pub struct EpubConverter {
    options: RenderOptions,
}

impl EpubConverter {
    #[must_use]
    pub const fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

impl SongConverter for EpubConverter {
    fn render(&self, song: &Song, context: &RenderContext<'_>) -> Result<String, RenderError> {
        let language = resolve_language(song, context.source_path, &self.options.default_language);
        debug!("渲染电子书 '{}'，语言 {}", song.title, language.locale);

        let substitutions = context.song_substitutions();
        let head = epub_head(
            song,
            &self.options,
            inject_fragments(&context.templates.head, &substitutions),
        );

        // 只处理歌曲正文，片段保持原样。
        let mut song_elements = compose_song(song);
        for element in &mut song_elements {
            mark_significant_whitespace(element);
        }
        let mut body = compose_body(song_elements, context.templates, &substitutions);
        body.set_attribute("epub:type", "bodymatter");

        let root = Element::new("html")
            .with_attribute("xmlns", XHTML_NAMESPACE)
            .with_attribute("xmlns:epub", EPUB_NAMESPACE)
            .with_attribute("lang", language.locale.as_str())
            .with_attribute("xml:lang", language.locale)
            .with_child(head)
            .with_child(body);

        let document = serialize_document(&root, Dialect::Xhtml, self.options.pretty_print)?;
        Ok(strip_row_joiners(&document))
    }

    fn extension(&self) -> &'static str {
        OutputVariant::Epub.extension()
    }
}
