//! # 批量渲染
//!
//! 把一组歌曲渲染到输出目录。每首歌曲相互独立，只共享只读的模板片段，
//! 因此可以按歌曲并行处理。

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use songbook_core::{RenderError, Song, Substitutions};
use tracing::{info, warn};

use crate::{
    fragment::SongTemplates,
    generator::{RenderContext, SongConverter},
};

/// 待渲染的一首歌曲及其可选的原始源文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongEntry {
    pub song: Song,
    pub source_path: Option<PathBuf>,
}

impl SongEntry {
    #[must_use]
    pub const fn new(song: Song) -> Self {
        Self {
            song,
            source_path: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source_path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(source_path.into());
        self
    }

    /// 输出文件基本名：源文件名去掉扩展名；没有源文件时由标题生成。
    #[must_use]
    pub fn base_filename(&self) -> String {
        self.source_path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| slugify(&self.song.title))
    }

    /// 源文件相对于歌曲根目录的路径，使用 `/` 分隔。
    #[must_use]
    pub fn relative_source(&self, songs_root: Option<&Path>) -> String {
        let Some(source) = self.source_path.as_deref() else {
            return String::new();
        };
        let relative = songs_root
            .and_then(|root| source.strip_prefix(root).ok())
            .unwrap_or(source);
        relative.to_string_lossy().replace('\\', "/")
    }
}

/// 从标题生成文件名：小写字母数字保留，其余字符折叠为单个下划线。
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let trimmed = slug.trim_end_matches('_');
    if trimmed.is_empty() {
        "song".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 从 JSON 文件读取歌曲模型。
pub fn load_song_json(path: &Path) -> Result<Song, RenderError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| RenderError::json(e, path.display().to_string()))
}

/// 批量渲染的参数。
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions<'a> {
    pub output_dir: &'a Path,
    pub songs_root: Option<&'a Path>,
    pub parallel: bool,
}

/// 渲染一批歌曲，返回写入的文件路径（与输入顺序一致）。
///
/// 输出目录不存在时会被创建。任意一首歌曲失败即返回错误，已写好的文件保持完整。
/// 两首歌曲得到相同的输出文件名时，不写入任何文件。
pub fn render_batch(
    converter: &dyn SongConverter,
    entries: &[SongEntry],
    templates: &SongTemplates,
    substitutions: &Substitutions,
    options: BatchOptions<'_>,
) -> Result<Vec<PathBuf>, RenderError> {
    let mut seen = HashSet::with_capacity(entries.len());
    if let Some(duplicate) = entries
        .iter()
        .map(SongEntry::base_filename)
        .find(|name| !seen.insert(name.clone()))
    {
        warn!("多首歌曲的输出文件名都是 '{duplicate}'");
        return Err(RenderError::DuplicateOutput(duplicate));
    }

    fs::create_dir_all(options.output_dir)?;
    info!(
        "开始渲染 {} 首歌曲到 {}（.{}）",
        entries.len(),
        options.output_dir.display(),
        converter.extension()
    );

    let render_one = |entry: &SongEntry| -> Result<PathBuf, RenderError> {
        let base_filename = entry.base_filename();
        let relative_source = entry.relative_source(options.songs_root);
        let mut context = RenderContext::new(templates, substitutions, &base_filename);
        if let Some(source) = entry.source_path.as_deref() {
            context = context.with_source(source, &relative_source);
        }

        let output = converter.output_path(options.output_dir, &base_filename);
        converter.write_song(&entry.song, &context, &output).inspect_err(|e| {
            warn!("渲染歌曲 '{}' 失败: {e}", entry.song.title);
        })?;
        Ok(output)
    };

    let written = if options.parallel {
        entries.par_iter().map(render_one).collect::<Result<Vec<_>, _>>()?
    } else {
        entries.iter().map(render_one).collect::<Result<Vec<_>, _>>()?
    };

    info!("渲染完成，共写入 {} 个文件", written.len());
    Ok(written)
}
