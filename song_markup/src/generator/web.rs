//! 网页格式：不带命名空间的 HTML 文档。

use songbook_core::{OutputVariant, RenderError, RenderOptions, Song};
use tracing::debug;

use super::{RenderContext, SongConverter, compose_body, compose_song, head::web_head};
use crate::{
    fragment::inject_fragments,
    language::resolve_language,
    serializer::{Dialect, serialize_document, strip_row_joiners},
    tree::Element,
};

/// 生成独立网页的转换器。
#[derive(Debug, Clone, Default)]
pub struct WebConverter {
    options: RenderOptions,
}

impl WebConverter {
    #[must_use]
    pub const fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

impl SongConverter for WebConverter {
    fn render(&self, song: &Song, context: &RenderContext<'_>) -> Result<String, RenderError> {
        let language = resolve_language(song, context.source_path, &self.options.default_language);
        debug!("渲染网页 '{}'，语言 {}", song.title, language.locale);

        let substitutions = context.song_substitutions();
        let head = web_head(
            song,
            &language,
            &self.options,
            context.base_filename,
            inject_fragments(&context.templates.head, &substitutions),
        )?;
        let body = compose_body(compose_song(song), context.templates, &substitutions);

        let root = Element::new("html")
            .with_attribute("lang", language.locale)
            .with_child(head)
            .with_child(body);

        let document = serialize_document(&root, Dialect::Html, self.options.pretty_print)?;
        Ok(strip_row_joiners(&document))
    }

    fn extension(&self) -> &'static str {
        OutputVariant::Web.extension()
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use songbook_core::{Block, Chunk, RenderOptionsBuilder, Row, SongBuilder, Substitutions};

    use super::*;
    use crate::{fragment::SongTemplates, serializer::ROW_JOINER};

    fn compact() -> WebConverter {
        WebConverter::new(
            RenderOptionsBuilder::default()
                .stylesheets(Vec::<String>::new())
                .pretty_print(false)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_minimal_document() {
        let song = SongBuilder::default()
            .title("Ej, przeleciał")
            .language("en")
            .block(Block::verse(vec![
                Row::over(vec![
                    Chunk::new("Am", ""),
                    Chunk::chord_only("F"),
                    Chunk::text_only("la la"),
                ])
                .with_repeat(true),
            ]))
            .build()
            .unwrap();
        let templates = SongTemplates::default();
        let substitutions = Substitutions::new();
        let context = RenderContext::new(&templates, &substitutions, "ej_przelecial");

        let document = compact().render(&song, &context).unwrap();
        assert!(!document.contains(ROW_JOINER));
        let body = document[document.find("<body").unwrap()..].trim_end();
        assert_snapshot!(body, @r#"<body class="song"><h1 class="title" id="title">Ej, przeleciał</h1><div class="song_body" id="song_body"><div class="block_spacer"><span class="block_id">1.</span></div><div class="verse"><div class="row over_true"><div class="lyric"><span class="ch-stack" aria-hidden="true"><span class="ch" role="note" aria-label="chord Am">Am</span><span class="ch" role="note" aria-label="chord F">F</span></span>la la</div><span class="bis_active"> </span></div></div></div></body></html>"#);
        assert!(document.starts_with("<!DOCTYPE html>\n<html lang=\"en-US\"><head><meta charset=\"utf-8\">"));
    }

    #[test]
    fn test_fragments_are_substituted_per_song() {
        let templates = SongTemplates::from_markup(
            r#"<link rel="alternate" href="{{BASE_FILENAME}}.xhtml"/>"#,
            r#"<nav><a href="index.html">Spis</a></nav>"#,
            r#"<footer data-src="{{SRC}}">{{BASE_FILENAME}}</footer>"#,
        )
        .unwrap();
        let substitutions = Substitutions::new();
        let song = SongBuilder::default().title("Hej").build().unwrap();
        let source = std::path::Path::new("songs/folk/hej.xml");
        let context = RenderContext::new(&templates, &substitutions, "hej")
            .with_source(source, "folk/hej.xml");

        let document = compact().render(&song, &context).unwrap();
        assert!(document.contains(r#"<link rel="alternate" href="hej.xhtml"><title>Hej</title>"#));
        assert!(document.contains(r#"<body class="song"><nav>"#));
        assert!(document.contains(r#"<footer data-src="folk/hej.xml">hej</footer></body>"#));
    }
}
